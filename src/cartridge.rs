use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const INES_HEADER_SIZE: usize = 16;
const NES_IDENTIFIER: [u8; 4] = [0x4Eu8, 0x45u8, 0x53u8, 0x1Au8];

bitflags! {
    // 7  bit  0
    // ---- ----
    // NNNN FTBM
    // |||| ||||
    // |||| |||+- Mirroring: 0: horizontal (vertical arrangement)
    // |||| |||              1: vertical (horizontal arrangement)
    // |||| ||+-- Cartridge contains battery-backed PRG RAM
    // |||| |+--- 512-byte trainer at $7000-$71FF (never set)
    // |||| +---- Four-screen VRAM
    // ++++------ Lower nybble of mapper number
    pub struct Flags6: u8 {
        const VERTICAL_MIRRORING = 0b0000_0001;
        const BATTERY_BACKED     = 0b0000_0010;
        const FOUR_SCREEN_VRAM   = 0b0000_1000;
    }
}

/// Payload of the `.ines` directive.
///
/// Deserialized from the JSON object following the directive; omitted
/// fields take their default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InesHeader {
    /// Number of 16KB PRG banks.
    #[serde(default = "default_prog")]
    pub prog: u8,
    /// Number of 8KB CHR banks.
    #[serde(default)]
    pub char: u8,
    #[serde(default)]
    pub mapper: u8,
    #[serde(default)]
    pub mirror: u8,
    #[serde(default)]
    pub battery_backed: u8,
    #[serde(default)]
    pub fourscreen_vram: u8,
    #[serde(default)]
    pub prog_ram: u8,
    #[serde(default)]
    pub tv: u8,
}

fn default_prog() -> u8 {
    1
}

impl Default for InesHeader {
    fn default() -> Self {
        InesHeader {
            prog: default_prog(),
            char: 0,
            mapper: 0,
            mirror: 0,
            battery_backed: 0,
            fourscreen_vram: 0,
            prog_ram: 0,
            tv: 0,
        }
    }
}

impl InesHeader {
    pub fn from_json(json: &str) -> Result<InesHeader> {
        let header: InesHeader = serde_json::from_str(json).map_err(|e| Error::InvalidInesHeader {
            message: e.to_string(),
        })?;
        header.validate()?;
        Ok(header)
    }

    fn validate(&self) -> Result<()> {
        if self.prog < 1 {
            return Err(Error::InvalidInesHeader {
                message: "prog must be at least 1".to_string(),
            });
        }
        let flags = [
            ("mirror", self.mirror),
            ("battery_backed", self.battery_backed),
            ("fourscreen_vram", self.fourscreen_vram),
        ];
        for (name, value) in flags.iter() {
            if *value > 1 {
                return Err(Error::InvalidInesHeader {
                    message: format!("{} must be 0 or 1, got {}", name, value),
                });
            }
        }
        Ok(())
    }

    pub fn flags6(&self) -> Flags6 {
        let mut flags = Flags6::empty();
        flags.set(Flags6::VERTICAL_MIRRORING, self.mirror == 1);
        flags.set(Flags6::BATTERY_BACKED, self.battery_backed == 1);
        flags.set(Flags6::FOUR_SCREEN_VRAM, self.fourscreen_vram == 1);
        flags
    }

    /// The 16-byte iNES 1.0 header.
    pub fn to_bytes(&self) -> [u8; INES_HEADER_SIZE] {
        let mapper_lo_nybble = self.mapper & 0x0F;
        let mapper_hi_nybble = (self.mapper & 0xF0) >> 4;

        let mut raw = [0u8; INES_HEADER_SIZE];
        raw[0..4].copy_from_slice(&NES_IDENTIFIER);
        raw[4] = self.prog;
        raw[5] = self.char;
        raw[6] = self.flags6().bits() | (mapper_lo_nybble << 4);
        raw[7] = mapper_hi_nybble << 4;
        raw[8] = self.prog_ram;
        raw
    }
}
