use crate::error::ProtocolError;

/// One unsolicited or acknowledgement line received from the
/// microcontroller.
#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryLine {
    /// Cumulative signed tick counts since microcontroller reset.
    Encoder { left_ticks: i32, right_ticks: i32 },
    /// Raw ADC reading of the infrared proximity sensor.
    Ir { raw: u16 },
    /// Acknowledgement of the most recently sent command.
    Ack,
    /// The microcontroller rejected the last command as malformed.
    Error(String),
}

/// Parses one already-trimmed line (no trailing `\n`/`\r`).
///
/// Unrecognised lines are an error, not a panic: the link layer logs and
/// discards them rather than propagating a parse failure that would
/// otherwise tear down the read loop.
pub fn parse_line(line: &str) -> Result<TelemetryLine, ProtocolError> {
    let line = line.trim();
    if line == "ACK" {
        return Ok(TelemetryLine::Ack);
    }
    if let Some(rest) = line.strip_prefix("ERROR:") {
        return Ok(TelemetryLine::Error(rest.to_string()));
    }
    if let Some(rest) = line.strip_prefix("ENCODER:") {
        let mut parts = rest.split(',');
        let left = parts.next().ok_or_else(|| malformed(line))?;
        let right = parts.next().ok_or_else(|| malformed(line))?;
        if parts.next().is_some() {
            return Err(malformed(line));
        }
        let left_ticks: i32 = left.trim().parse().map_err(|_| malformed(line))?;
        let right_ticks: i32 = right.trim().parse().map_err(|_| malformed(line))?;
        return Ok(TelemetryLine::Encoder { left_ticks, right_ticks });
    }
    if let Some(rest) = line.strip_prefix("IR:") {
        let raw: u16 = rest.trim().parse().map_err(|_| malformed(line))?;
        return Ok(TelemetryLine::Ir { raw });
    }
    Err(ProtocolError::UnknownTelemetry(line.to_string()))
}

fn malformed(line: &str) -> ProtocolError {
    ProtocolError::MalformedLine(line.to_string())
}

/// Signed tick delta between two cumulative encoder readings, handling the
/// (rare, but possible on long runs) i32 wraparound.
pub fn tick_delta(previous: i32, current: i32) -> i32 {
    current.wrapping_sub(previous)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ack() {
        assert_eq!(parse_line("ACK").unwrap(), TelemetryLine::Ack);
    }

    #[test]
    fn parses_error_with_text() {
        assert_eq!(
            parse_line("ERROR:bad checksum").unwrap(),
            TelemetryLine::Error("bad checksum".to_string())
        );
    }

    #[test]
    fn parses_encoder_with_negative_ticks() {
        assert_eq!(
            parse_line("ENCODER:-12,340").unwrap(),
            TelemetryLine::Encoder { left_ticks: -12, right_ticks: 340 }
        );
    }

    #[test]
    fn parses_ir() {
        assert_eq!(parse_line("IR:512").unwrap(), TelemetryLine::Ir { raw: 512 });
    }

    #[test]
    fn rejects_unknown_keyword() {
        assert!(matches!(
            parse_line("FOO:1"),
            Err(ProtocolError::UnknownTelemetry(_))
        ));
    }

    #[test]
    fn rejects_malformed_encoder() {
        assert!(matches!(
            parse_line("ENCODER:1"),
            Err(ProtocolError::MalformedLine(_))
        ));
        assert!(matches!(
            parse_line("ENCODER:1,2,3"),
            Err(ProtocolError::MalformedLine(_))
        ));
        assert!(matches!(
            parse_line("ENCODER:abc,2"),
            Err(ProtocolError::MalformedLine(_))
        ));
    }

    #[test]
    fn tick_delta_handles_wraparound() {
        assert_eq!(tick_delta(i32::MAX, i32::MIN), 1);
        assert_eq!(tick_delta(0, 5), 5);
        assert_eq!(tick_delta(5, 0), -5);
    }
}
