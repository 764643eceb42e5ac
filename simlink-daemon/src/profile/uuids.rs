//! Service class UUIDs for the profiles managed here.

use uuid::Uuid;

/// Base UUID of the Bluetooth SIG assigned numbers.
pub const BASE_UUID: Uuid = Uuid::from_u128(0x0000_0000_0000_1000_8000_0080_5f9b_34fb);

/// SIM Access Profile service class (0x112D).
pub const SAP: Uuid = from_short(0x112D);

/// Expands a 16-bit assigned number into a full 128-bit UUID.
pub const fn from_short(short: u16) -> Uuid {
    Uuid::from_u128(BASE_UUID.as_u128() | ((short as u128) << 96))
}
