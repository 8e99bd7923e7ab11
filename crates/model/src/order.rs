//! The `Order` entity (§3 "Order"; §4.8). Persisted whole as the `Value` of
//! two B+-trees: `orders_order_*` (`hash64(username) -> Order`) and, while
//! `PENDING`, also `orders_pending_*` (`(hash64(trainID), originDate) ->
//! Order`) — grounded in the original `orderManager.hpp`'s `orderDB` /
//! `pendingQueue` pair.
//!
//! `timestamp` is the first field so the derived `Ord` — which `find()`
//! uses to return values "sorted ascending by value" (§4.5.2 step 3) —
//! sorts by timestamp first. That gives `queryOrder`/`processPendingOrders`
//! the ascending-by-timestamp order §8's monotonicity and pending-FIFO
//! properties require, for free.

use std::io::{self, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use storage::record::Codec;

use crate::fixed_str::FixedStr;
use crate::station::STATION_NAME_LEN;
use crate::train::TRAIN_ID_LEN;
use crate::user::USERNAME_LEN;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[repr(u8)]
pub enum OrderStatus {
    #[default]
    Success = 0,
    Pending = 1,
    Refunded = 2,
}

impl OrderStatus {
    fn to_byte(self) -> u8 {
        self as u8
    }

    fn from_byte(b: u8) -> io::Result<Self> {
        match b {
            0 => Ok(Self::Success),
            1 => Ok(Self::Pending),
            2 => Ok(Self::Refunded),
            other => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("invalid OrderStatus byte {other}"),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Order {
    /// The command's globally-unique id; total order of orders (§3).
    pub timestamp: i64,
    pub username: FixedStr<USERNAME_LEN>,
    pub train_id: FixedStr<TRAIN_ID_LEN>,
    pub from_station: FixedStr<STATION_NAME_LEN>,
    pub from_idx: i32,
    pub to_station: FixedStr<STATION_NAME_LEN>,
    pub to_idx: i32,
    /// Originating date (mm-dd packed), GLOSSARY.
    pub origin_date: u16,
    /// Absolute minute of `(originDate, trainStartTime)`.
    pub departure_from_origin: i64,
    /// Absolute minute this leg departs `from_station`.
    pub departure_from_station: i64,
    /// Absolute minute this leg arrives at `to_station`.
    pub arrival_at_station: i64,
    /// Unit-price x `num` (§3).
    pub price: i64,
    pub num: i32,
    pub status: OrderStatus,
}

impl Codec for Order {
    const WIDTH: usize = 8
        + FixedStr::<USERNAME_LEN>::WIDTH
        + FixedStr::<TRAIN_ID_LEN>::WIDTH
        + FixedStr::<STATION_NAME_LEN>::WIDTH
        + 4
        + FixedStr::<STATION_NAME_LEN>::WIDTH
        + 4
        + 2
        + 8
        + 8
        + 8
        + 8
        + 4
        + 1;

    fn encode<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_i64::<LittleEndian>(self.timestamp)?;
        self.username.encode(w)?;
        self.train_id.encode(w)?;
        self.from_station.encode(w)?;
        w.write_i32::<LittleEndian>(self.from_idx)?;
        self.to_station.encode(w)?;
        w.write_i32::<LittleEndian>(self.to_idx)?;
        w.write_u16::<LittleEndian>(self.origin_date)?;
        w.write_i64::<LittleEndian>(self.departure_from_origin)?;
        w.write_i64::<LittleEndian>(self.departure_from_station)?;
        w.write_i64::<LittleEndian>(self.arrival_at_station)?;
        w.write_i64::<LittleEndian>(self.price)?;
        w.write_i32::<LittleEndian>(self.num)?;
        w.write_u8(self.status.to_byte())
    }

    fn decode<R: Read>(r: &mut R) -> io::Result<Self> {
        let timestamp = r.read_i64::<LittleEndian>()?;
        let username = FixedStr::decode(r)?;
        let train_id = FixedStr::decode(r)?;
        let from_station = FixedStr::decode(r)?;
        let from_idx = r.read_i32::<LittleEndian>()?;
        let to_station = FixedStr::decode(r)?;
        let to_idx = r.read_i32::<LittleEndian>()?;
        let origin_date = r.read_u16::<LittleEndian>()?;
        let departure_from_origin = r.read_i64::<LittleEndian>()?;
        let departure_from_station = r.read_i64::<LittleEndian>()?;
        let arrival_at_station = r.read_i64::<LittleEndian>()?;
        let price = r.read_i64::<LittleEndian>()?;
        let num = r.read_i32::<LittleEndian>()?;
        let status = OrderStatus::from_byte(r.read_u8()?)?;
        Ok(Self {
            timestamp,
            username,
            train_id,
            from_station,
            from_idx,
            to_station,
            to_idx,
            origin_date,
            departure_from_origin,
            departure_from_station,
            arrival_at_station,
            price,
            num,
            status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(timestamp: i64) -> Order {
        Order {
            timestamp,
            username: FixedStr::new("alice").unwrap(),
            train_id: FixedStr::new("G1").unwrap(),
            from_station: FixedStr::new("A").unwrap(),
            from_idx: 0,
            to_station: FixedStr::new("B").unwrap(),
            to_idx: 2,
            origin_date: 601,
            departure_from_origin: 0,
            departure_from_station: 10,
            arrival_at_station: 70,
            price: 500,
            num: 5,
            status: OrderStatus::Success,
        }
    }

    #[test]
    fn round_trips() {
        let o = sample(42);
        let mut buf = Vec::new();
        o.encode(&mut buf).unwrap();
        let decoded = Order::decode(&mut &buf[..]).unwrap();
        assert_eq!(decoded, o);
    }

    #[test]
    fn ordered_by_timestamp_first() {
        let older = sample(1);
        let newer = sample(2);
        assert!(older < newer);
    }
}
