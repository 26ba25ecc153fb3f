//! Binary frame schema for the chat socket.
//!
//! One frame per fixed-size audio callback buffer, or one text frame per
//! routed message. The schema is fixed by the remote service; the messages are
//! written out by hand rather than generated.

use prost::Message;

/// Sample rate the socket pipe captures and transmits at.
pub const SOCKET_SAMPLE_RATE: u32 = 16_000;

/// Channel count on the socket pipe.
pub const SOCKET_NUM_CHANNELS: u32 = 1;

/// Samples per capture callback buffer; one frame is sent per buffer.
pub const CAPTURE_BUFFER_SAMPLES: usize = 512;

#[derive(Clone, PartialEq, Message)]
pub struct TextFrame {
    #[prost(uint64, tag = "1")]
    pub id: u64,
    #[prost(string, tag = "2")]
    pub name: String,
    #[prost(string, tag = "3")]
    pub text: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct AudioRawFrame {
    #[prost(uint64, tag = "1")]
    pub id: u64,
    #[prost(string, tag = "2")]
    pub name: String,
    /// 16-bit little-endian PCM samples.
    #[prost(bytes = "vec", tag = "3")]
    pub audio: Vec<u8>,
    #[prost(uint32, tag = "4")]
    pub sample_rate: u32,
    #[prost(uint32, tag = "5")]
    pub num_channels: u32,
}

#[derive(Clone, PartialEq, Message)]
pub struct Frame {
    #[prost(oneof = "frame::Payload", tags = "1, 2")]
    pub payload: Option<frame::Payload>,
}

pub mod frame {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Payload {
        #[prost(message, tag = "1")]
        Text(super::TextFrame),
        #[prost(message, tag = "2")]
        Audio(super::AudioRawFrame),
    }
}

/// Encode a text frame for the socket.
pub fn encode_text_frame(text: &str) -> Vec<u8> {
    let frame = Frame {
        payload: Some(frame::Payload::Text(TextFrame {
            id: 0,
            name: String::new(),
            text: text.to_string(),
        })),
    };
    frame.encode_to_vec()
}

/// Encode one buffer of PCM samples as an audio frame.
pub fn encode_audio_frame(samples: &[i16]) -> Vec<u8> {
    let mut audio = Vec::with_capacity(samples.len() * 2);
    for sample in samples {
        audio.extend_from_slice(&sample.to_le_bytes());
    }
    let frame = Frame {
        payload: Some(frame::Payload::Audio(AudioRawFrame {
            id: 0,
            name: String::new(),
            audio,
            sample_rate: SOCKET_SAMPLE_RATE,
            num_channels: SOCKET_NUM_CHANNELS,
        })),
    };
    frame.encode_to_vec()
}

/// Decode a frame received or captured off the socket.
pub fn decode_frame(data: &[u8]) -> Result<Frame, prost::DecodeError> {
    Frame::decode(data)
}

/// Convert float samples in [-1, 1] to signed 16-bit PCM.
///
/// Negative values scale by 32768 and positive by 32767 so both ends of the
/// range saturate exactly.
pub fn convert_f32_to_s16_pcm(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&sample| {
            let clamped = sample.clamp(-1.0, 1.0);
            if clamped < 0.0 {
                (clamped * 32768.0) as i16
            } else {
                (clamped * 32767.0) as i16
            }
        })
        .collect()
}
