// Copyright (c) The RoleVault QA Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Small helpers shared with the command-line tool.

use chrono::{DateTime, SecondsFormat, Utc};

/// Replaces every character outside `[A-Za-z0-9]` with `_`.
///
/// Non-ASCII characters are replaced one-for-one, so the output has the same
/// number of characters as the input.
pub(crate) fn sanitize_for_file_name(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Removes ANSI escape sequences (colors, cursor movement) from text.
pub(crate) fn strip_ansi(text: &str) -> String {
    strip_ansi_escapes::strip_str(text)
}

/// Formats an instant as an ISO 8601 string that is safe to embed in a file
/// name, e.g. `2024-05-01T12-34-56-789Z`.
pub(crate) fn file_name_timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-")
}

/// Picks the singular or plural form of a word for `count`.
pub fn plural(count: usize, singular: &'static str, plural: &'static str) -> &'static str {
    if count == 1 { singular } else { plural }
}

/// Serde helpers for timestamps with millisecond precision.
pub(crate) mod millis_timestamp {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub(crate) fn serialize<S: Serializer>(
        value: &DateTime<Utc>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub(crate) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let s = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use test_case::test_case;

    #[test_case("login works", "login_works"; "spaces")]
    #[test_case("Admin: create user (P0)", "Admin__create_user__P0_"; "punctuation")]
    #[test_case("café", "caf_"; "non-ascii")]
    #[test_case("", ""; "empty")]
    fn sanitize(input: &str, expected: &str) {
        assert_eq!(sanitize_for_file_name(input), expected);
    }

    #[test]
    fn strip_ansi_removes_colors() {
        assert_eq!(
            strip_ansi("\u{1b}[31mExpected\u{1b}[39m: \u{1b}[2m\"a\"\u{1b}[22m"),
            "Expected: \"a\"",
        );
    }

    #[test]
    fn timestamp_is_filesystem_safe() {
        let now = Utc
            .with_ymd_and_hms(2024, 5, 1, 12, 34, 56)
            .single()
            .expect("valid date")
            + chrono::Duration::milliseconds(789);
        assert_eq!(file_name_timestamp(now), "2024-05-01T12-34-56-789Z");
    }
}
