//! Bech32 address validation and prefix conversion.
//!
//! Cosmos chains address accounts and validator operators with the same
//! key material under different bech32 prefixes (`cosmos1...` vs
//! `cosmosvaloper1...`). The scrape engine validates caller-supplied
//! addresses before launching any fetch task for them, and the vote
//! family needs to re-express a validator operator address under the
//! account prefix. Both require a real bech32 decode, so the codec
//! (BIP-173 charset + polymod checksum) lives here.

use std::fmt;

const CHARSET: &[u8; 32] = b"qpzry9x8gf2tvdw0s3jn54khce6mua7l";

const GENERATOR: [u32; 5] = [0x3b6a57b2, 0x26508e6d, 0x1ea119fa, 0x3d4233dd, 0x2a1462b3];

/// Why an address string was rejected.
#[derive(Debug, PartialEq, Eq)]
pub enum AddressError {
    /// Structurally not bech32 (separator, charset, casing, length).
    Malformed(&'static str),
    /// Valid bech32 but under an unexpected prefix.
    WrongPrefix { expected: String, found: String },
    /// Checksum did not verify.
    Checksum,
}

impl fmt::Display for AddressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressError::Malformed(msg) => write!(f, "malformed bech32 address: {msg}"),
            AddressError::WrongPrefix { expected, found } => {
                write!(f, "wrong bech32 prefix: expected {expected}, found {found}")
            }
            AddressError::Checksum => write!(f, "bech32 checksum mismatch"),
        }
    }
}

impl std::error::Error for AddressError {}

fn polymod(values: &[u8]) -> u32 {
    let mut chk: u32 = 1;
    for &v in values {
        let top = chk >> 25;
        chk = (chk & 0x1ff_ffff) << 5 ^ u32::from(v);
        for (i, generator) in GENERATOR.iter().enumerate() {
            if (top >> i) & 1 == 1 {
                chk ^= generator;
            }
        }
    }
    chk
}

fn hrp_expand(hrp: &str) -> Vec<u8> {
    let bytes = hrp.as_bytes();
    let mut out = Vec::with_capacity(bytes.len() * 2 + 1);
    out.extend(bytes.iter().map(|b| b >> 5));
    out.push(0);
    out.extend(bytes.iter().map(|b| b & 0x1f));
    out
}

fn create_checksum(hrp: &str, data: &[u8]) -> [u8; 6] {
    let mut values = hrp_expand(hrp);
    values.extend_from_slice(data);
    values.extend_from_slice(&[0u8; 6]);
    let pm = polymod(&values) ^ 1;
    let mut checksum = [0u8; 6];
    for (i, c) in checksum.iter_mut().enumerate() {
        *c = ((pm >> (5 * (5 - i))) & 0x1f) as u8;
    }
    checksum
}

/// Decodes a bech32 string into its prefix and 5-bit data payload
/// (checksum stripped).
fn decode(s: &str) -> Result<(String, Vec<u8>), AddressError> {
    if s.len() > 90 {
        return Err(AddressError::Malformed("too long"));
    }
    if s.chars().any(|c| c.is_ascii_uppercase()) {
        // Mixed case is invalid per BIP-173; addresses are lowercase.
        return Err(AddressError::Malformed("uppercase characters"));
    }
    let sep = s.rfind('1').ok_or(AddressError::Malformed("missing separator"))?;
    if sep == 0 {
        return Err(AddressError::Malformed("empty prefix"));
    }
    let (hrp, data_part) = (&s[..sep], &s[sep + 1..]);
    if data_part.len() < 6 {
        return Err(AddressError::Malformed("data part too short"));
    }

    let mut data = Vec::with_capacity(data_part.len());
    for c in data_part.bytes() {
        let value = CHARSET
            .iter()
            .position(|&x| x == c)
            .ok_or(AddressError::Malformed("invalid data character"))?;
        data.push(value as u8);
    }

    let mut values = hrp_expand(hrp);
    values.extend_from_slice(&data);
    if polymod(&values) != 1 {
        return Err(AddressError::Checksum);
    }

    data.truncate(data.len() - 6);
    Ok((hrp.to_string(), data))
}

/// Encodes a 5-bit payload under the given prefix.
pub(crate) fn encode(hrp: &str, data: &[u8]) -> String {
    let checksum = create_checksum(hrp, data);
    let mut out = String::with_capacity(hrp.len() + 1 + data.len() + 6);
    out.push_str(hrp);
    out.push('1');
    for &d in data.iter().chain(checksum.iter()) {
        out.push(CHARSET[d as usize] as char);
    }
    out
}

fn decode_with_prefix(s: &str, prefix: &str) -> Result<Vec<u8>, AddressError> {
    let (hrp, payload) = decode(s)?;
    if hrp != prefix {
        return Err(AddressError::WrongPrefix {
            expected: prefix.to_string(),
            found: hrp,
        });
    }
    Ok(payload)
}

/// A validated account (wallet) address.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccAddress(String);

impl AccAddress {
    /// Validates `s` against the configured account prefix.
    pub fn from_bech32(s: &str, prefix: &str) -> Result<Self, AddressError> {
        decode_with_prefix(s, prefix)?;
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A validated validator operator address.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValAddress {
    bech: String,
    payload: Vec<u8>,
}

impl ValAddress {
    /// Validates `s` against the configured validator prefix.
    pub fn from_bech32(s: &str, prefix: &str) -> Result<Self, AddressError> {
        let payload = decode_with_prefix(s, prefix)?;
        Ok(Self {
            bech: s.to_string(),
            payload,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.bech
    }

    /// Re-encodes the operator key material under the account prefix.
    ///
    /// Governance votes are recorded against the account address, so the
    /// vote family looks up votes with this form of the address.
    pub fn to_account(&self, account_prefix: &str) -> AccAddress {
        AccAddress(encode(account_prefix, &self.payload))
    }
}

impl fmt::Display for ValAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.bech)
    }
}
