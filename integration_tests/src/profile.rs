//! micro:bit GATT profile as seen from the central.

use uuid::Uuid;

/// Advertised name prefix; the five-letter friendly name and "]" follow
pub const NAME_PREFIX: &str = "BBC micro:bit [";

/// Payload bytes per UART notification
pub const UART_PAYLOAD: usize = 20;

/// Bytes the device buffers before giving up on a delimiter
pub const UART_RX_BUFFER: usize = 61;

const fn microbit(short: u16) -> Uuid {
    Uuid::from_u128(0xE95D0000_251D_470A_A062_FA1922DFA9A8 | ((short as u128) << 96))
}

const fn nordic_uart(short: u16) -> Uuid {
    Uuid::from_u128(0x6E400000_B5A3_F393_E0A9_E50E24DCCA9E | ((short as u128) << 96))
}

/// Device to central
pub const UART_TX: Uuid = nordic_uart(0x0002);
/// Central to device
pub const UART_RX: Uuid = nordic_uart(0x0003);

/// Services the firmware starts, with one characteristic each to look for
pub const SERVICES: [(&str, Uuid, Uuid); 7] = [
    ("accelerometer", microbit(0x0753), microbit(0xCA4B)),
    ("button", microbit(0x9882), microbit(0xDA90)),
    ("io pin", microbit(0x127B), microbit(0x8D00)),
    ("led", microbit(0xD91D), microbit(0x7B77)),
    ("temperature", microbit(0x6100), microbit(0x9250)),
    ("magnetometer", microbit(0xF2D8), microbit(0xFB11)),
    ("uart", nordic_uart(0x0001), UART_TX),
];

/// Whether `name` has the `BBC micro:bit [xxxxx]` shape
pub fn is_microbit_name(name: &str) -> bool {
    let Some(rest) = name.strip_prefix(NAME_PREFIX) else {
        return false;
    };
    let Some(friendly) = rest.strip_suffix(']') else {
        return false;
    };

    const CONSONANTS: &str = "zvgpt";
    const VOWELS: &str = "uoiea";
    friendly.len() == 5
        && friendly.chars().enumerate().all(|(i, c)| {
            if i % 2 == 0 {
                CONSONANTS.contains(c)
            } else {
                VOWELS.contains(c)
            }
        })
}
