//! The `Station` record (§3 "Station record"). Persisted as a contiguous,
//! `stationNum`-long block of fixed-size records in `trains_station_bucket`
//! (§6.1) — `FixedSizeRecord`, not `Codec`: stations are addressed by
//! `(stationBucketID + index)`, never used as a B+-tree key or value.

use std::io::{self, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use storage::record::{Codec, FixedSizeRecord};

use crate::fixed_str::FixedStr;

pub const STATION_NAME_LEN: usize = 32;

/// *Offsets are monotone non-decreasing with station index; start has
/// arrival=-1, end has leaving=-1; price is cumulative (not per-leg) from
/// origin* (§3).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Station {
    pub is_start: bool,
    pub is_end: bool,
    pub name: FixedStr<STATION_NAME_LEN>,
    /// Cumulative price from the origin station.
    pub price: i64,
    /// Minutes from the train's midnight start point; -1 at the start station.
    pub arrival_offset: i32,
    /// Minutes from the train's midnight start point; -1 at the end station.
    pub leaving_offset: i32,
    pub index: u16,
}

impl FixedSizeRecord for Station {
    const ENCODED_LEN: usize = 1 + 1 + (1 + STATION_NAME_LEN) + 8 + 4 + 4 + 2;

    fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_u8(self.is_start as u8)?;
        w.write_u8(self.is_end as u8)?;
        self.name.encode(w)?;
        w.write_i64::<LittleEndian>(self.price)?;
        w.write_i32::<LittleEndian>(self.arrival_offset)?;
        w.write_i32::<LittleEndian>(self.leaving_offset)?;
        w.write_u16::<LittleEndian>(self.index)
    }

    fn read_from<R: Read>(r: &mut R) -> io::Result<Self> {
        let is_start = r.read_u8()? != 0;
        let is_end = r.read_u8()? != 0;
        let name = FixedStr::decode(r)?;
        let price = r.read_i64::<LittleEndian>()?;
        let arrival_offset = r.read_i32::<LittleEndian>()?;
        let leaving_offset = r.read_i32::<LittleEndian>()?;
        let index = r.read_u16::<LittleEndian>()?;
        Ok(Self {
            is_start,
            is_end,
            name,
            price,
            arrival_offset,
            leaving_offset,
            index,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let s = Station {
            is_start: true,
            is_end: false,
            name: FixedStr::new("Hamburg").unwrap(),
            price: 0,
            arrival_offset: -1,
            leaving_offset: 0,
            index: 0,
        };
        let mut buf = Vec::new();
        s.write_to(&mut buf).unwrap();
        let decoded = Station::read_from(&mut &buf[..]).unwrap();
        assert_eq!(decoded, s);
    }
}
