//! Decode-once codec for the transport layer.
//!
//! - Text frames => Envelope
//! - Binary frames => Envelope (UTF-8 JSON only)
//! - Close is surfaced for lifecycle management

use eventlink_core::{
    error::Result,
    protocol::{self, Envelope},
};

use crate::transport::LinkEvent;

#[derive(Debug)]
pub enum Inbound {
    Envelope { env: Envelope, bytes_len: usize },
    Closed { reason: Option<String> },
}

pub fn decode(ev: LinkEvent) -> Result<Inbound> {
    match ev {
        LinkEvent::Text(s) => {
            let bytes_len = s.len();
            let env = protocol::decode(&s)?;
            Ok(Inbound::Envelope { env, bytes_len })
        }
        LinkEvent::Binary(b) => {
            let bytes_len = b.len();
            let env = protocol::decode_bytes(&b)?;
            Ok(Inbound::Envelope { env, bytes_len })
        }
        LinkEvent::Closed { reason } => Ok(Inbound::Closed { reason }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_and_binary_frames_decode() {
        let t = decode(LinkEvent::Text(r#"{"type":"a"}"#.into())).unwrap();
        assert!(matches!(t, Inbound::Envelope { bytes_len: 12, .. }));
        let b = decode(LinkEvent::Binary(bytes::Bytes::from_static(br#"{"type":"b"}"#))).unwrap();
        assert!(matches!(b, Inbound::Envelope { ref env, .. } if env.event_type == "b"));
    }

    #[test]
    fn malformed_frame_is_an_error() {
        let err = decode(LinkEvent::Text("{".into())).unwrap_err();
        assert_eq!(err.code().as_str(), "DECODE");
    }
}
