// command.rs

/// Maps an inbound control payload to the relay drive level.
///
/// Only two payloads mean anything, compared byte-for-byte. The level
/// mapping follows the relay wiring: "ligar" releases the coil (LOW) and
/// "desligar" energizes it (HIGH). Everything else is ignored.
pub fn parse_relay_command(payload: &[u8]) -> Option<bool> {
    match payload {
        b"ligar" => Some(false),
        b"desligar" => Some(true),
        _ => None,
    }
}

/// Acknowledgement string echoed to the control topic after a relay write.
pub fn relay_ack(level: bool) -> &'static str {
    if level { "ligado" } else { "desligado" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_payloads_map_to_levels() {
        assert_eq!(parse_relay_command(b"ligar"), Some(false));
        assert_eq!(parse_relay_command(b"desligar"), Some(true));
    }

    #[test]
    fn unknown_payloads_are_ignored() {
        assert_eq!(parse_relay_command(b""), None);
        assert_eq!(parse_relay_command(b"Ligar"), None);
        assert_eq!(parse_relay_command(b"ligar "), None);
        assert_eq!(parse_relay_command(b"toggle"), None);
        assert_eq!(parse_relay_command("ligação".as_bytes()), None);
    }

    #[test]
    fn ack_echoes_the_written_level() {
        assert_eq!(relay_ack(true), "ligado");
        assert_eq!(relay_ack(false), "desligado");
    }
}

// EOF
