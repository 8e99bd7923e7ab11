//! The `Train` catalog entity (§3 "Train"; §4.7.1). Persisted whole as the
//! `Value` of `trains_train_*`'s `hash64(trainID) -> Train` B+-tree, the
//! same "embed the record directly in the tree" shape as [`crate::User`]
//! (§9, "Hash-keyed B+-trees").

use std::io::{self, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use storage::record::Codec;

use crate::fixed_str::FixedStr;

pub const TRAIN_ID_LEN: usize = 20;

/// `ticketBucketID == -1` until `releaseTrain` allocates the seat bucket
/// (§3 "Train").
pub const UNRELEASED_TICKET_BUCKET: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Train {
    pub train_id: FixedStr<TRAIN_ID_LEN>,
    pub station_num: u16,
    /// First record id of the `stationNum`-long contiguous block in
    /// `trains_station_bucket`.
    pub station_bucket_id: i64,
    pub seat_num: u32,
    /// `-1` until released.
    pub ticket_bucket_id: i64,
    /// mm-dd, packed as `month*100+day` (§6.2).
    pub sale_start: u16,
    pub sale_end: u16,
    /// Minutes of day the train departs its first station.
    pub start_time: u16,
    /// A single ASCII character train-type tag (e.g. `G`, `D`, `K`).
    pub train_type: u8,
    pub is_released: bool,
}

impl Codec for Train {
    const WIDTH: usize = FixedStr::<TRAIN_ID_LEN>::WIDTH + 2 + 8 + 4 + 8 + 2 + 2 + 2 + 1 + 1;

    fn encode<W: Write>(&self, w: &mut W) -> io::Result<()> {
        self.train_id.encode(w)?;
        w.write_u16::<LittleEndian>(self.station_num)?;
        w.write_i64::<LittleEndian>(self.station_bucket_id)?;
        w.write_u32::<LittleEndian>(self.seat_num)?;
        w.write_i64::<LittleEndian>(self.ticket_bucket_id)?;
        w.write_u16::<LittleEndian>(self.sale_start)?;
        w.write_u16::<LittleEndian>(self.sale_end)?;
        w.write_u16::<LittleEndian>(self.start_time)?;
        w.write_u8(self.train_type)?;
        w.write_u8(self.is_released as u8)
    }

    fn decode<R: Read>(r: &mut R) -> io::Result<Self> {
        let train_id = FixedStr::decode(r)?;
        let station_num = r.read_u16::<LittleEndian>()?;
        let station_bucket_id = r.read_i64::<LittleEndian>()?;
        let seat_num = r.read_u32::<LittleEndian>()?;
        let ticket_bucket_id = r.read_i64::<LittleEndian>()?;
        let sale_start = r.read_u16::<LittleEndian>()?;
        let sale_end = r.read_u16::<LittleEndian>()?;
        let start_time = r.read_u16::<LittleEndian>()?;
        let train_type = r.read_u8()?;
        let is_released = r.read_u8()? != 0;
        Ok(Self {
            train_id,
            station_num,
            station_bucket_id,
            seat_num,
            ticket_bucket_id,
            sale_start,
            sale_end,
            start_time,
            train_type,
            is_released,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let t = Train {
            train_id: FixedStr::new("G1234").unwrap(),
            station_num: 3,
            station_bucket_id: 7,
            seat_num: 100,
            ticket_bucket_id: UNRELEASED_TICKET_BUCKET,
            sale_start: 601,
            sale_end: 630,
            start_time: 480,
            train_type: b'G',
            is_released: false,
        };
        let mut buf = Vec::new();
        t.encode(&mut buf).unwrap();
        let decoded = Train::decode(&mut &buf[..]).unwrap();
        assert_eq!(decoded, t);
    }
}
