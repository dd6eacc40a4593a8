//! Bar pattern encoders.

use barcode_core::{Result, SheetError};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Symbology {
    /// Code 128, code set B (ASCII 32-127).
    #[default]
    Code128,
    /// EAN-13 from 12 data digits; the check digit is computed.
    Ean13,
}

/// Module sequence of one symbol. `dark[i]` is a bar module; `guard[i]`
/// marks modules of guard patterns, which are drawn taller.
#[derive(Clone, Debug, PartialEq)]
pub struct Encoded {
    pub dark: Vec<bool>,
    pub guard: Vec<bool>,
    pub quiet_left: usize,
    pub quiet_right: usize,
    /// Human readable line printed under the bars.
    pub text: String,
}

impl Encoded {
    pub fn total_modules(&self) -> usize {
        self.quiet_left + self.dark.len() + self.quiet_right
    }
}

impl Symbology {
    pub fn encode(self, code: &str) -> Result<Encoded> {
        match self {
            Symbology::Code128 => encode_code128(code),
            Symbology::Ean13 => encode_ean13(code),
        }
    }
}

// Bar/space widths for symbol values 0..=106; 106 is the stop pattern.
const CODE128_PATTERNS: [&str; 107] = [
    "212222", "222122", "222221", "121223", "121322", "131222", "122213", "122312", "132212",
    "221213", "221312", "231212", "112232", "122132", "122231", "113222", "123122", "123221",
    "223211", "221132", "221231", "213212", "223112", "312131", "311222", "321122", "321221",
    "312212", "322112", "322211", "212123", "212321", "232121", "111323", "131123", "131321",
    "112313", "132113", "132311", "211313", "231113", "231311", "112133", "112331", "132131",
    "113123", "113321", "133121", "313121", "211331", "231131", "213113", "213311", "213131",
    "311123", "311321", "331121", "312113", "312311", "332111", "314111", "221411", "431111",
    "111224", "111422", "121124", "121421", "141122", "141221", "112214", "112412", "122114",
    "122411", "142112", "142211", "241211", "221114", "413111", "241112", "134111", "111242",
    "121142", "121241", "114212", "124112", "124211", "411212", "421112", "421211", "212141",
    "214121", "412121", "111143", "111341", "131141", "114113", "114311", "411113", "411311",
    "113141", "114131", "311141", "411131", "211412", "211214", "211232", "2331112",
];
const CODE128_START_B: usize = 104;
const CODE128_STOP: usize = 106;

fn push_widths(dark: &mut Vec<bool>, widths: &str) {
    for (i, w) in widths.bytes().enumerate() {
        let bar = i % 2 == 0;
        for _ in 0..(w - b'0') {
            dark.push(bar);
        }
    }
}

pub fn encode_code128(code: &str) -> Result<Encoded> {
    if code.is_empty() {
        return Err(SheetError::rendering("Code 128 cannot encode an empty code"));
    }
    let mut values = Vec::with_capacity(code.len() + 3);
    values.push(CODE128_START_B);
    for ch in code.chars() {
        let c = ch as u32;
        if !(32..=127).contains(&c) {
            return Err(SheetError::rendering(format!(
                "Code 128 set B cannot encode {ch:?} in {code:?}"
            )));
        }
        values.push((c - 32) as usize);
    }
    let checksum = values
        .iter()
        .enumerate()
        .map(|(pos, v)| pos.max(1) * v)
        .sum::<usize>()
        % 103;
    values.push(checksum);
    values.push(CODE128_STOP);

    let mut dark = Vec::with_capacity(values.len() * 11 + 2);
    for v in values {
        push_widths(&mut dark, CODE128_PATTERNS[v]);
    }
    let guard = vec![false; dark.len()];
    Ok(Encoded {
        dark,
        guard,
        quiet_left: 10,
        quiet_right: 10,
        text: code.to_string(),
    })
}

const EAN_L: [&str; 10] = [
    "0001101", "0011001", "0010011", "0111101", "0100011", "0110001", "0101111", "0111011",
    "0110111", "0001011",
];
const EAN_G: [&str; 10] = [
    "0100111", "0110011", "0011011", "0100001", "0011101", "0111001", "0000101", "0010001",
    "0001001", "0010111",
];
const EAN_R: [&str; 10] = [
    "1110010", "1100110", "1101100", "1000010", "1011100", "1001110", "1010000", "1000100",
    "1001000", "1110100",
];
// Left-half parity selected by the leading digit: L = odd, G = even.
const EAN_PARITY: [&str; 10] = [
    "LLLLLL", "LLGLGG", "LLGGLG", "LLGGGL", "LGLLGG", "LGGLLG", "LGGGLL", "LGLGLG", "LGLGGL",
    "LGGLGL",
];

/// Mod-10 check digit over 12 EAN data digits.
pub fn ean13_check_digit(digits: &[u8; 12]) -> u8 {
    let sum: u32 = digits
        .iter()
        .enumerate()
        .map(|(i, d)| *d as u32 * if i % 2 == 0 { 1 } else { 3 })
        .sum();
    ((10 - sum % 10) % 10) as u8
}

pub fn encode_ean13(code: &str) -> Result<Encoded> {
    let bytes = code.as_bytes();
    if bytes.len() != 12 || !bytes.iter().all(u8::is_ascii_digit) {
        return Err(SheetError::rendering(format!(
            "EAN-13 needs exactly 12 digits, got {code:?} ({} characters)",
            code.chars().count()
        )));
    }
    let mut digits = [0u8; 12];
    for (d, b) in digits.iter_mut().zip(bytes) {
        *d = b - b'0';
    }
    let check = ean13_check_digit(&digits);

    let mut dark = Vec::with_capacity(95);
    let mut guard = Vec::with_capacity(95);
    let mut push = |pattern: &str, is_guard: bool| {
        for b in pattern.bytes() {
            dark.push(b == b'1');
            guard.push(is_guard);
        }
    };
    push("101", true);
    let parity = EAN_PARITY[digits[0] as usize].as_bytes();
    for (i, d) in digits[1..7].iter().enumerate() {
        let table = if parity[i] == b'L' { &EAN_L } else { &EAN_G };
        push(table[*d as usize], false);
    }
    push("01010", true);
    for d in digits[7..].iter().chain(std::iter::once(&check)) {
        push(EAN_R[*d as usize], false);
    }
    push("101", true);

    Ok(Encoded {
        dark,
        guard,
        quiet_left: 11,
        quiet_right: 7,
        text: format!("{code}{check}"),
    })
}
