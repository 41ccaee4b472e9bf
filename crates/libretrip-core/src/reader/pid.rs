//! Mode 01 PID scaling
//!
//! Converts the raw data bytes of a Mode 01 reply into physical units.

use super::ParameterId;

/// Mode 01 request string for a parameter, e.g. `"010D"`
pub fn request(parameter: ParameterId) -> String {
    format!("01{:02X}", parameter.pid())
}

/// Scale raw reply bytes into a physical value
///
/// Returns `None` when the reply is too short for the parameter.
pub fn decode(parameter: ParameterId, data: &[u8]) -> Option<f64> {
    let a = f64::from(*data.first()?);
    let word = || -> Option<f64> { Some(a * 256.0 + f64::from(*data.get(1)?)) };

    let value = match parameter {
        ParameterId::Speed => a,
        ParameterId::MassAirFlow => word()? / 100.0,
        ParameterId::Rpm => word()? / 4.0,
        ParameterId::EngineLoad | ParameterId::FuelLevel => a * 100.0 / 255.0,
        ParameterId::DiagnosticCodes => f64::from(data[0] & 0x7F),
    };
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_strings() {
        assert_eq!(request(ParameterId::Speed), "010D");
        assert_eq!(request(ParameterId::FuelLevel), "012F");
    }

    #[test]
    fn test_decode_scaling() {
        assert_eq!(decode(ParameterId::Speed, &[0x32]), Some(50.0));
        assert_eq!(decode(ParameterId::Rpm, &[0x1A, 0xF8]), Some(1726.0));
        assert_eq!(decode(ParameterId::MassAirFlow, &[0x01, 0xF4]), Some(5.0));
        assert_eq!(decode(ParameterId::EngineLoad, &[0xFF]), Some(100.0));
        assert_eq!(decode(ParameterId::DiagnosticCodes, &[0x83, 0x07, 0x65, 0x04]), Some(3.0));
    }

    #[test]
    fn test_decode_short_reply() {
        assert_eq!(decode(ParameterId::Rpm, &[0x1A]), None);
        assert_eq!(decode(ParameterId::Speed, &[]), None);
    }
}
