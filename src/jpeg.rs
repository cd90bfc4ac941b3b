//! JPEG header probe.
//!
//! Just enough of the marker stream to tell whether a received buffer is a
//! baseline/progressive JPEG and how large the frame is. Decoding proper
//! is the panel's business.

const SOI: u8 = 0xD8;
const EOI: u8 = 0xD9;
const SOS: u8 = 0xDA;

/// Frame header summary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct JpegInfo {
    pub width: u16,
    pub height: u16,
    pub components: u8,
}

/// Find the start-of-frame header. `None` if `data` is not a JPEG or the
/// header is truncated.
pub fn probe(data: &[u8]) -> Option<JpegInfo> {
    if data.get(..2)? != [0xFF, SOI] {
        return None;
    }

    let mut pos = 2;
    loop {
        // Markers may be padded with any number of 0xFF fill bytes.
        if *data.get(pos)? != 0xFF {
            return None;
        }
        while *data.get(pos)? == 0xFF {
            pos += 1;
        }
        let marker = *data.get(pos)?;
        pos += 1;

        match marker {
            EOI | SOS => return None,
            // Standalone markers carry no length.
            0x01 | 0xD0..=0xD7 => continue,
            _ => {}
        }

        let len = usize::from(u16::from_be_bytes([*data.get(pos)?, *data.get(pos + 1)?]));
        if len < 2 {
            return None;
        }

        if is_start_of_frame(marker) {
            let segment = data.get(pos + 2..pos + len)?;
            if segment.len() < 6 {
                return None;
            }
            return Some(JpegInfo {
                height: u16::from_be_bytes([segment[1], segment[2]]),
                width: u16::from_be_bytes([segment[3], segment[4]]),
                components: segment[5],
            });
        }

        pos += len;
    }
}

/// SOF0..SOF15 minus DHT (C4), JPG (C8) and DAC (CC).
fn is_start_of_frame(marker: u8) -> bool {
    matches!(marker, 0xC0..=0xCF) && !matches!(marker, 0xC4 | 0xC8 | 0xCC)
}
