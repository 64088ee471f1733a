//! Protocol module containing the beacon message and its JSON codec.

pub mod beacon;

pub use beacon::{decode_beacon, encode_beacon, BeaconMessage, ProtocolError, BEACON_TYPE};
