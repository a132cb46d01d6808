//! Command codes: a single validated byte destined for the keyboard firmware.
//!
//! Parsing is strict. Only plain digits are accepted (no sign, no
//! whitespace), and the value must fit in one byte. Nothing that fails here
//! ever reaches the device.

use crate::error::{Error, Result};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// A command byte in the range 0..=255.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Command(u8);

impl Command {
    /// Wrap a raw byte.
    pub const fn new(code: u8) -> Self {
        Self(code)
    }

    /// The raw command byte.
    pub const fn code(self) -> u8 {
        self.0
    }

    /// Parse from an optional argument, rejecting a missing one.
    pub fn from_arg(arg: Option<&str>) -> Result<Self> {
        match arg {
            Some(s) => s.parse(),
            None => Err(Error::invalid_command("", "missing command argument")),
        }
    }

    /// Parse a hexadecimal command code, with or without a `0x` prefix.
    pub fn parse_hex(input: &str) -> Result<Self> {
        let digits = input
            .strip_prefix("0x")
            .or_else(|| input.strip_prefix("0X"))
            .unwrap_or(input);
        parse_digits(input, digits, 16)
    }
}

impl FromStr for Command {
    type Err = Error;

    /// Parse a decimal command code.
    fn from_str(s: &str) -> Result<Self> {
        parse_digits(s, s, 10)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:02X})", self.0, self.0)
    }
}

fn parse_digits(input: &str, digits: &str, radix: u32) -> Result<Command> {
    if digits.is_empty() {
        return Err(Error::invalid_command(input, "empty command"));
    }
    if !digits.chars().all(|c| c.is_digit(radix)) {
        return Err(Error::invalid_command(
            input,
            format!("not a base-{radix} number"),
        ));
    }
    // All digits at this point, so the only failure left is overflow.
    let value = u32::from_str_radix(digits, radix).unwrap_or(u32::MAX);
    u8::try_from(value)
        .map(Command)
        .map_err(|_| Error::invalid_command(input, "out of range (allowed 0..=255)"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_invalid(result: Result<Command>) {
        assert!(
            matches!(result, Err(Error::InvalidCommand { .. })),
            "expected InvalidCommand, got {result:?}"
        );
    }

    #[test]
    fn parses_every_byte_from_decimal() {
        for n in 0..=255u8 {
            let cmd: Command = n.to_string().parse().unwrap();
            assert_eq!(cmd.code(), n);
        }
    }

    #[test]
    fn accepts_leading_zeros() {
        assert_eq!("007".parse::<Command>().unwrap().code(), 7);
    }

    #[test]
    fn rejects_out_of_range() {
        assert_invalid("256".parse());
        assert_invalid("1000".parse());
        assert_invalid("99999999999999999999999".parse());
    }

    #[test]
    fn rejects_non_numeric() {
        assert_invalid("".parse());
        assert_invalid("abc".parse());
        assert_invalid("12a".parse());
        assert_invalid("-1".parse());
        assert_invalid("+1".parse());
        assert_invalid(" 1".parse());
        assert_invalid("1.5".parse());
        assert_invalid("NaN".parse());
    }

    #[test]
    fn decimal_does_not_accept_hex_prefix() {
        assert_invalid("0x10".parse());
    }

    #[test]
    fn from_arg_rejects_missing() {
        assert_invalid(Command::from_arg(None));
        assert_eq!(Command::from_arg(Some("4")).unwrap().code(), 4);
    }

    #[test]
    fn parse_hex_with_and_without_prefix() {
        assert_eq!(Command::parse_hex("ff").unwrap().code(), 0xFF);
        assert_eq!(Command::parse_hex("0x03").unwrap().code(), 0x03);
        assert_eq!(Command::parse_hex("0X0A").unwrap().code(), 0x0A);
    }

    #[test]
    fn parse_hex_rejects_bad_input() {
        assert_invalid(Command::parse_hex("0x"));
        assert_invalid(Command::parse_hex("100"));
        assert_invalid(Command::parse_hex("zz"));
    }

    #[test]
    fn invalid_command_keeps_input() {
        match "300".parse::<Command>() {
            Err(Error::InvalidCommand { input, .. }) => assert_eq!(input, "300"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn display_shows_decimal_and_hex() {
        assert_eq!(Command::new(255).to_string(), "255 (0xFF)");
    }
}
