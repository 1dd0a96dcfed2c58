// Copyright (c) The RoleVault QA Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use clap::Parser;
use color_eyre::Result;
use rolevault_cli::RoleVaultReportApp;

fn main() -> Result<()> {
    color_eyre::install()?;

    let app = RoleVaultReportApp::parse();
    let output = app.init_output();

    match app.exec(&mut std::io::stdout().lock()) {
        Ok(code) => std::process::exit(code),
        Err(error) => {
            error.display_to_stderr(&output.stderr_styles());
            std::process::exit(error.process_exit_code())
        }
    }
}
