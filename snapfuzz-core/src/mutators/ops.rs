//! Low-level byte-buffer mutation primitives shared by both mutator engines.
//!
//! Each function mutates `buf` in place, respecting `max_size`, and reports
//! whether it actually changed anything (a mutator applied to a buffer too
//! small for its operation, e.g. erasing from a 0-byte buffer, is a no-op).

use crate::mutators::dictionary::{DictEntry, Dictionary};
use crate::rand::Rand;

/// "Interesting" values libFuzzer-style integer mutators like to splice in,
/// at 1/2/4/8-byte widths (boundary values: zero, signed extremes, powers of
/// two minus one).
const INTERESTING_8: &[i8] = &[-128, -1, 0, 1, 16, 32, 64, 100, 127];
const INTERESTING_16: &[i16] = &[-32768, -129, 128, 255, 256, 512, 1000, 1024, 4096, 32767];
const INTERESTING_32: &[i32] = &[
    i32::MIN,
    -100_000,
    -32769,
    32768,
    65535,
    65536,
    100_000,
    i32::MAX,
];

pub fn shuffle_bytes(buf: &mut Vec<u8>, rand: &mut dyn Rand) -> bool {
    if buf.len() < 2 {
        return false;
    }
    let start = rand.below(buf.len() as u64) as usize;
    let max_window = buf.len() - start;
    let window = 1 + rand.below(max_window as u64) as usize;
    let slice = &mut buf[start..start + window];
    for i in (1..slice.len()).rev() {
        let j = rand.below((i + 1) as u64) as usize;
        slice.swap(i, j);
    }
    true
}

pub fn erase_bytes(buf: &mut Vec<u8>, rand: &mut dyn Rand) -> bool {
    if buf.len() < 2 {
        return false;
    }
    let start = rand.below(buf.len() as u64) as usize;
    let max_len = buf.len() - start;
    let len = 1 + rand.below(max_len as u64) as usize;
    buf.drain(start..start + len);
    true
}

pub fn insert_byte(buf: &mut Vec<u8>, max_size: usize, rand: &mut dyn Rand) -> bool {
    if buf.len() >= max_size {
        return false;
    }
    let pos = rand.below((buf.len() + 1) as u64) as usize;
    let byte = rand.below(256) as u8;
    buf.insert(pos, byte);
    true
}

pub fn insert_repeated_byte(buf: &mut Vec<u8>, max_size: usize, rand: &mut dyn Rand) -> bool {
    if buf.len() >= max_size {
        return false;
    }
    let room = max_size - buf.len();
    let count = 1 + rand.below(room.min(16) as u64) as usize;
    let pos = rand.below((buf.len() + 1) as u64) as usize;
    let byte = rand.below(256) as u8;
    let run = vec![byte; count];
    buf.splice(pos..pos, run);
    true
}

pub fn change_byte(buf: &mut Vec<u8>, rand: &mut dyn Rand) -> bool {
    if buf.is_empty() {
        return false;
    }
    let pos = rand.below(buf.len() as u64) as usize;
    buf[pos] = rand.below(256) as u8;
    true
}

pub fn change_bit(buf: &mut Vec<u8>, rand: &mut dyn Rand) -> bool {
    if buf.is_empty() {
        return false;
    }
    let pos = rand.below(buf.len() as u64) as usize;
    let bit = rand.below(8) as u8;
    buf[pos] ^= 1 << bit;
    true
}

pub fn copy_part(buf: &mut Vec<u8>, max_size: usize, rand: &mut dyn Rand) -> bool {
    if buf.len() < 2 {
        return false;
    }
    let from = rand.below(buf.len() as u64) as usize;
    let max_len = buf.len() - from;
    let len = 1 + rand.below(max_len as u64) as usize;
    let chunk: Vec<u8> = buf[from..from + len].to_vec();

    let to = rand.below((buf.len() + 1) as u64) as usize;
    if rand.coinflip_n_of_m(1, 2) && buf.len() + chunk.len() <= max_size {
        // Insert a copy rather than overwrite.
        buf.splice(to..to, chunk);
    } else {
        // Overwrite in place, truncating the chunk to fit.
        let avail = buf.len().saturating_sub(to);
        let n = chunk.len().min(avail);
        buf[to..to + n].copy_from_slice(&chunk[..n]);
    }
    true
}

pub fn cross_over(
    buf: &mut Vec<u8>,
    max_size: usize,
    other: &[u8],
    rand: &mut dyn Rand,
) -> bool {
    if other.is_empty() {
        return false;
    }
    let from = rand.below(other.len() as u64) as usize;
    let max_len = other.len() - from;
    let len = (1 + rand.below(max_len as u64) as usize).min(max_size);
    let chunk = &other[from..from + len];

    let to = rand.below((buf.len() + 1) as u64) as usize;
    if buf.len() + chunk.len() <= max_size {
        buf.splice(to..to, chunk.iter().copied());
    } else {
        let avail = buf.len().saturating_sub(to);
        let n = chunk.len().min(avail);
        buf[to..to + n].copy_from_slice(&chunk[..n]);
    }
    true
}

pub fn add_word_from_dict(
    buf: &mut Vec<u8>,
    max_size: usize,
    dict: &mut Dictionary,
    rand: &mut dyn Rand,
) -> bool {
    if dict.is_empty() || buf.len() >= max_size {
        return false;
    }
    let idx = rand.below(dict.len() as u64) as usize;
    let Some(entry) = dict.get_mut(idx) else {
        return false;
    };
    entry.record_use();
    let word = entry.word().to_vec();
    let pos = entry
        .position_hint()
        .filter(|p| *p <= buf.len())
        .unwrap_or_else(|| rand.below((buf.len() + 1) as u64) as usize);

    let room = max_size - buf.len();
    let word = if word.len() > room {
        word[..room].to_vec()
    } else {
        word
    };
    buf.splice(pos..pos, word);
    true
}

pub fn change_ascii_integer(buf: &mut Vec<u8>, rand: &mut dyn Rand) -> bool {
    if buf.is_empty() {
        return false;
    }
    let start = rand.below(buf.len() as u64) as usize;
    let mut end = start;
    while end < buf.len() && buf[end].is_ascii_digit() {
        end += 1;
    }
    if end == start {
        return false;
    }
    let digits = std::str::from_utf8(&buf[start..end]).unwrap_or("0");
    let Ok(value) = digits.parse::<i64>() else {
        return false;
    };
    let delta = 1 + rand.below(10) as i64;
    let new_value = if rand.coinflip_n_of_m(1, 2) {
        value.wrapping_add(delta)
    } else {
        value.wrapping_sub(delta)
    };
    let replacement = new_value.to_string();
    buf.splice(start..end, replacement.bytes());
    true
}

pub fn change_binary_integer(buf: &mut Vec<u8>, rand: &mut dyn Rand) -> bool {
    if buf.is_empty() {
        return false;
    }
    let width = match rand.below(4) {
        0 => 1,
        1 => 2,
        2 => 4,
        _ => 8,
    }
    .min(buf.len());
    if width == 0 {
        return false;
    }
    let pos = rand.below((buf.len() - width + 1) as u64) as usize;
    let bytes = match width {
        1 => {
            let v = INTERESTING_8[rand.below(INTERESTING_8.len() as u64) as usize];
            vec![v as u8]
        }
        2 => {
            let v = INTERESTING_16[rand.below(INTERESTING_16.len() as u64) as usize];
            v.to_le_bytes().to_vec()
        }
        4 => {
            let v = INTERESTING_32[rand.below(INTERESTING_32.len() as u64) as usize];
            v.to_le_bytes().to_vec()
        }
        _ => {
            let v = rand.next_u64();
            v.to_le_bytes().to_vec()
        }
    };
    buf[pos..pos + width].copy_from_slice(&bytes[..width]);
    true
}
