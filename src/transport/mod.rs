//! Real-time transports: the vendor room boundary and the raw chat socket.

pub mod frames;
pub mod room;
pub mod socket;

pub use room::{
    MediaStream, NetworkScores, RemoteTrack, RoomConnection, RoomConnectionState, RoomEvent,
    RoomProvider, RoomQualityLevel, TrackKind,
};
pub use socket::{ChatSocket, FrameSink, SocketEvent};
