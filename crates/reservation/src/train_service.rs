//! The train catalog and seat inventory (§4.7), grounded in the original
//! `trainManager.hpp`'s `Train`/`Station` pair and the seat-bucket scheme
//! described in the original source's order/train interaction.

use model::date::{DayMinutes, MonthDay, Timestamp};
use model::fixed_str::FixedStr;
use model::hash::hash64;
use model::station::Station;
use model::train::{TRAIN_ID_LEN, UNRELEASED_TICKET_BUCKET};
use model::Train;
use storage::{CachedPagedFile, Engine, VarIntFile};

use crate::error::{Error, Result};
use crate::trees::{TicketLookupTree, TrainTree, TransferLookupTree};

/// Sort key requested by `queryTicket`/`queryTransfer` (§4.7.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortBy {
    Time,
    Cost,
}

/// One line of `queryTrain`'s itinerary (§4.7.2). `None` offsets render as
/// the terminal placeholders the wire format uses for the start/end rows.
#[derive(Debug, Clone)]
pub struct StationLine {
    pub name: String,
    pub arrival: Option<(MonthDay, DayMinutes)>,
    pub leaving: Option<(MonthDay, DayMinutes)>,
    pub price: i64,
    /// Seats left on the leg departing this station; `None` at the terminus.
    pub seats_remaining: Option<u32>,
}

/// A single direct-train offer from `queryTicket`, also used as the two legs
/// of a `queryTransfer` result.
#[derive(Debug, Clone)]
pub struct TicketCandidate {
    pub train_id: String,
    pub from: String,
    pub to: String,
    pub departure: (MonthDay, DayMinutes),
    pub arrival: (MonthDay, DayMinutes),
    pub price: i64,
    pub seats_available: u32,
    pub duration_minutes: i64,
}

#[derive(Debug, Clone)]
pub struct TransferCandidate {
    pub first: TicketCandidate,
    pub second: TicketCandidate,
}

/// Outcome of `T.buyTicket` (§4.7.3), resolved from station names down to
/// indices and offsets the way `order_service::OrderService::buy_ticket`
/// needs in order to build the `Order` record.
#[derive(Debug, Clone, Copy)]
pub struct BuyTicketOutcome {
    /// Unit price x `num`.
    pub price: i64,
    pub origin_date: MonthDay,
    pub successful: bool,
    pub from_idx: usize,
    pub to_idx: usize,
    pub departure_offset: i32,
    pub arrival_offset: i32,
}

pub struct TrainService {
    trains: TrainTree,
    stations: CachedPagedFile<Station>,
    tickets: VarIntFile,
    ticket_lookup: TicketLookupTree,
    transfer_lookup: TransferLookupTree,
}

impl TrainService {
    pub fn open(engine: &Engine) -> Result<Self> {
        Ok(Self {
            trains: engine.open_btree("trains_train")?,
            stations: engine.open_cached_file("trains_station_bucket", 0)?,
            tickets: engine.open_varint_file("trains_ticket_bucket", 0)?,
            ticket_lookup: engine.open_btree("trains_ticket_lookup")?,
            transfer_lookup: engine.open_btree("trains_transfer_lookup")?,
        })
    }

    fn find_train(&mut self, train_id: &str) -> Result<Option<Train>> {
        let key = hash64(train_id);
        let candidates = self.trains.find(key)?;
        Ok(candidates
            .into_iter()
            .find(|t| t.train_id.as_str() == train_id))
    }

    fn read_stations(&mut self, train: &Train) -> Result<Vec<Station>> {
        let mut out = Vec::with_capacity(train.station_num as usize);
        for i in 0..train.station_num as u64 {
            out.push(self.stations.read(train.station_bucket_id as u64 + i)?);
        }
        Ok(out)
    }

    /// Adds an unreleased train (§4.7.1 `addTrain`). `prices`/`travel_times`
    /// hold one entry per leg (`station_num - 1`); `stopover_times` holds one
    /// entry per intermediate station (`station_num - 2`, empty for a
    /// two-station train).
    #[allow(clippy::too_many_arguments)]
    pub fn add_train(
        &mut self,
        train_id: &str,
        station_num: u16,
        seat_num: u32,
        station_names: &[&str],
        prices: &[i64],
        start_time: DayMinutes,
        travel_times: &[i64],
        stopover_times: &[i64],
        sale_start: MonthDay,
        sale_end: MonthDay,
        train_type: u8,
    ) -> Result<()> {
        let n = station_num as usize;
        if station_names.len() != n || prices.len() + 1 != n || travel_times.len() + 1 != n {
            return Err(Error::Validation("station/price/travel-time count mismatch"));
        }
        if stopover_times.len() != n.saturating_sub(2) {
            return Err(Error::Validation("stopover-time count mismatch"));
        }
        if self.find_train(train_id)?.is_some() {
            return Err(Error::Validation("trainID already exists"));
        }

        let mut price = vec![0i64; n];
        let mut arrival = vec![0i32; n];
        let mut leaving = vec![0i32; n];
        arrival[0] = -1;
        leaving[0] = 0;
        for i in 1..n {
            price[i] = price[i - 1] + prices[i - 1];
            arrival[i] = leaving[i - 1] + travel_times[i - 1] as i32;
            leaving[i] = if i == n - 1 {
                -1
            } else {
                arrival[i] + stopover_times[i - 1] as i32
            };
        }

        let mut first_id = None;
        for i in 0..n {
            let station = Station {
                is_start: i == 0,
                is_end: i == n - 1,
                name: FixedStr::new(station_names[i])?,
                price: price[i],
                arrival_offset: arrival[i],
                leaving_offset: leaving[i],
                index: i as u16,
            };
            let id = self.stations.append(&station)?;
            if first_id.is_none() {
                first_id = Some(id as i64);
            }
        }

        let train = Train {
            train_id: FixedStr::new(train_id)?,
            station_num,
            station_bucket_id: first_id.expect("station_num > 0 checked by validation above"),
            seat_num,
            ticket_bucket_id: UNRELEASED_TICKET_BUCKET,
            sale_start: sale_start.mmdd(),
            sale_end: sale_end.mmdd(),
            start_time: start_time.minutes(),
            train_type,
            is_released: false,
        };
        self.trains.insert(hash64(train_id), train)?;
        tracing::debug!(train_id, station_num, seat_num, "train added");
        Ok(())
    }

    /// Removes an unreleased train and its station block (§4.7.1
    /// `deleteTrain`). Released trains cannot be deleted.
    pub fn delete_train(&mut self, train_id: &str) -> Result<()> {
        let train = self
            .find_train(train_id)?
            .ok_or(Error::NotFound("train not found"))?;
        if train.is_released {
            return Err(Error::Validation("cannot delete a released train"));
        }
        for i in 0..train.station_num as u64 {
            self.stations.remove(train.station_bucket_id as u64 + i)?;
        }
        self.trains.remove(hash64(train_id), train)?;
        Ok(())
    }

    /// Allocates the seat-inventory bucket and the `byPair`/`byFrom` lookup
    /// indexes (§4.7.1 `releaseTrain`). Idempotent calls are rejected.
    pub fn release_train(&mut self, train_id: &str) -> Result<()> {
        let old = self
            .find_train(train_id)?
            .ok_or(Error::NotFound("train not found"))?;
        if old.is_released {
            return Err(Error::Validation("train already released"));
        }
        let sale_start = MonthDay::from_mmdd(old.sale_start)?;
        let sale_end = MonthDay::from_mmdd(old.sale_end)?;
        let sale_days = (sale_start.days_until(sale_end) + 1) as usize;
        let legs = old.station_num as usize - 1;
        let ticket_bucket_id = self.tickets.append(old.seat_num as i32, sale_days * legs)?;

        let mut released = old;
        released.ticket_bucket_id = ticket_bucket_id as i64;
        released.is_released = true;
        let key = hash64(train_id);
        self.trains.remove(key, old)?;
        self.trains.insert(key, released)?;

        let train_id_fixed = FixedStr::<TRAIN_ID_LEN>::new(train_id)?;
        let stations = self.read_stations(&released)?;
        let n = stations.len();
        for i in 0..n {
            if i + 1 < n {
                self.transfer_lookup
                    .insert(hash64(stations[i].name.as_str()), train_id_fixed)?;
            }
            for j in i + 1..n {
                self.ticket_lookup.insert(
                    (
                        hash64(stations[i].name.as_str()),
                        hash64(stations[j].name.as_str()),
                    ),
                    train_id_fixed,
                )?;
            }
        }
        tracing::debug!(train_id, sale_days, legs, "train released");
        Ok(())
    }

    /// The full itinerary of `train_id` as it runs on `date` (§4.7.2
    /// `queryTrain`). Unreleased trains report full seat capacity on every
    /// leg, since no inventory bucket exists yet.
    pub fn query_train(&mut self, train_id: &str, date: MonthDay) -> Result<Vec<StationLine>> {
        let train = self
            .find_train(train_id)?
            .ok_or(Error::NotFound("train not found"))?;
        let sale_start = MonthDay::from_mmdd(train.sale_start)?;
        let sale_end = MonthDay::from_mmdd(train.sale_end)?;
        if date < sale_start || date > sale_end {
            return Err(Error::Validation("date outside the train's sale window"));
        }

        let stations = self.read_stations(&train)?;
        let n = stations.len();
        let legs = n - 1;
        let day_index = sale_start.days_until(date) as usize;
        let leg_seats = if train.is_released {
            self.tickets
                .read_range(train.ticket_bucket_id as u64, day_index * legs, legs)?
        } else {
            vec![train.seat_num as i32; legs]
        };

        let start_time = DayMinutes::new(train.start_time)?;
        let base_ts = Timestamp::new(date, start_time);
        let mut out = Vec::with_capacity(n);
        for (i, station) in stations.iter().enumerate() {
            let arrival = if station.arrival_offset >= 0 {
                Some(base_ts.add_minutes(station.arrival_offset as i64)?)
            } else {
                None
            };
            let leaving = if station.leaving_offset >= 0 {
                Some(base_ts.add_minutes(station.leaving_offset as i64)?)
            } else {
                None
            };
            out.push(StationLine {
                name: station.name.as_str().to_string(),
                arrival,
                leaving,
                price: station.price,
                seats_remaining: if i < legs {
                    Some(leg_seats[i].max(0) as u32)
                } else {
                    None
                },
            });
        }
        Ok(out)
    }

    fn direct_candidate(
        &mut self,
        train: &Train,
        stations: &[Station],
        from_idx: usize,
        to_idx: usize,
        reference_date: MonthDay,
    ) -> Result<Option<TicketCandidate>> {
        let sale_start = MonthDay::from_mmdd(train.sale_start)?;
        let sale_end = MonthDay::from_mmdd(train.sale_end)?;
        let day_shift =
            (stations[from_idx].leaving_offset as i64 + train.start_time as i64).div_euclid(1440);
        let origin_date = match reference_date.add_days(-day_shift) {
            Ok(d) => d,
            Err(_) => return Ok(None),
        };
        if origin_date < sale_start || origin_date > sale_end {
            return Ok(None);
        }

        let legs = stations.len() - 1;
        let day_index = sale_start.days_until(origin_date) as usize;
        let leg_seats = if train.is_released {
            self.tickets.read_range(
                train.ticket_bucket_id as u64,
                day_index * legs + from_idx,
                to_idx - from_idx,
            )?
        } else {
            vec![train.seat_num as i32; to_idx - from_idx]
        };
        let seats_available = leg_seats.iter().copied().min().unwrap_or(0).max(0) as u32;

        let start_time = DayMinutes::new(train.start_time)?;
        let base_ts = Timestamp::new(origin_date, start_time);
        let departure = base_ts.add_minutes(stations[from_idx].leaving_offset as i64)?;
        let arrival = base_ts.add_minutes(stations[to_idx].arrival_offset as i64)?;
        let price = stations[to_idx].price - stations[from_idx].price;
        let duration_minutes =
            (stations[to_idx].arrival_offset - stations[from_idx].leaving_offset) as i64;

        Ok(Some(TicketCandidate {
            train_id: train.train_id.as_str().to_string(),
            from: stations[from_idx].name.as_str().to_string(),
            to: stations[to_idx].name.as_str().to_string(),
            departure,
            arrival,
            price,
            seats_available,
            duration_minutes,
        }))
    }

    /// Every direct train covering `from` -> `to` departing on `date`,
    /// ordered per `sort_by` (§4.7.2 `queryTicket`).
    pub fn query_ticket(
        &mut self,
        from: &str,
        to: &str,
        date: MonthDay,
        sort_by: SortBy,
    ) -> Result<Vec<TicketCandidate>> {
        let key = (hash64(from), hash64(to));
        let train_ids = self.ticket_lookup.find(key)?;
        let mut results = Vec::new();
        for train_id_fixed in train_ids {
            let train_id = train_id_fixed.as_str();
            let Some(train) = self.find_train(train_id)? else {
                continue;
            };
            if !train.is_released {
                continue;
            }
            let stations = self.read_stations(&train)?;
            let from_idx = stations.iter().position(|s| s.name.as_str() == from);
            let to_idx = stations.iter().position(|s| s.name.as_str() == to);
            let (Some(from_idx), Some(to_idx)) = (from_idx, to_idx) else {
                continue;
            };
            if from_idx >= to_idx {
                continue;
            }
            if let Some(candidate) =
                self.direct_candidate(&train, &stations, from_idx, to_idx, date)?
            {
                results.push(candidate);
            }
        }
        sort_candidates(&mut results, sort_by);
        Ok(results)
    }

    /// The best one-transfer itinerary `from` -> `mid` -> `to` departing on
    /// `date` (§4.7.2 `queryTransfer`). Returns `None` when no combination of
    /// a train1 leg and a train2 leg exists.
    pub fn query_transfer(
        &mut self,
        from: &str,
        to: &str,
        date: MonthDay,
        sort_by: SortBy,
    ) -> Result<Option<TransferCandidate>> {
        let train1_ids = self.transfer_lookup.find(hash64(from))?;
        let mut best: Option<TransferCandidate> = None;

        for train1_id_fixed in train1_ids {
            let train1_id = train1_id_fixed.as_str();
            let Some(train1) = self.find_train(train1_id)? else {
                continue;
            };
            if !train1.is_released {
                continue;
            }
            let stations1 = self.read_stations(&train1)?;
            let Some(from_idx) = stations1.iter().position(|s| s.name.as_str() == from) else {
                continue;
            };
            if from_idx + 1 >= stations1.len() {
                continue;
            }

            for mid_idx in from_idx + 1..stations1.len() {
                let mid_name = stations1[mid_idx].name.as_str();
                if mid_name == to {
                    continue;
                }
                let Some(first) =
                    self.direct_candidate(&train1, &stations1, from_idx, mid_idx, date)?
                else {
                    continue;
                };
                let arrival_at_mid = Timestamp::new(first.arrival.0, first.arrival.1).raw_minutes();

                let mut reference_dates = vec![first.arrival.0];
                if let Ok(next_day) = first.arrival.0.add_days(1) {
                    reference_dates.push(next_day);
                }
                for reference_date in reference_dates {
                    let train2_ids = self
                        .ticket_lookup
                        .find((hash64(mid_name), hash64(to)))?;
                    for train2_id_fixed in &train2_ids {
                        let train2_id = train2_id_fixed.as_str();
                        if train2_id == train1_id {
                            continue;
                        }
                        let Some(train2) = self.find_train(train2_id)? else {
                            continue;
                        };
                        if !train2.is_released {
                            continue;
                        }
                        let stations2 = self.read_stations(&train2)?;
                        let Some(mid_idx2) =
                            stations2.iter().position(|s| s.name.as_str() == mid_name)
                        else {
                            continue;
                        };
                        let Some(to_idx2) = stations2.iter().position(|s| s.name.as_str() == to)
                        else {
                            continue;
                        };
                        if mid_idx2 >= to_idx2 {
                            continue;
                        }
                        let Some(second) = self.direct_candidate(
                            &train2,
                            &stations2,
                            mid_idx2,
                            to_idx2,
                            reference_date,
                        )?
                        else {
                            continue;
                        };
                        let departure_at_mid =
                            Timestamp::new(second.departure.0, second.departure.1).raw_minutes();
                        if departure_at_mid < arrival_at_mid {
                            continue;
                        }

                        let candidate = TransferCandidate {
                            first: first.clone(),
                            second,
                        };
                        if is_better(&candidate, best.as_ref(), sort_by) {
                            best = Some(candidate);
                        }
                    }
                }
            }
        }
        Ok(best)
    }

    /// Resolves `from`/`to` to indices, computes the originating date, and
    /// attempts to subtract `num` from every leg in `[fromIdx, toIdx)` for
    /// that day (§4.7.3 `buyTicket`, called by O). Per the preserved source
    /// quirk, the subtraction is written to disk regardless of outcome;
    /// `successful` reports whether every leg stayed non-negative after the
    /// write. Callers that must not charge a failed attempt (pending-order
    /// promotion, refunds) use [`Self::update_left_seats`] /
    /// [`Self::refund_ticket`] instead.
    pub fn buy_ticket(
        &mut self,
        train_id: &str,
        date: MonthDay,
        num: u32,
        from: &str,
        to: &str,
    ) -> Result<BuyTicketOutcome> {
        let train = self
            .find_train(train_id)?
            .ok_or(Error::NotFound("train not found"))?;
        if !train.is_released {
            return Err(Error::Validation("train not released"));
        }
        let stations = self.read_stations(&train)?;
        let from_idx = stations
            .iter()
            .position(|s| s.name.as_str() == from)
            .ok_or(Error::NotFound("from station not found on this train"))?;
        let to_idx = stations
            .iter()
            .position(|s| s.name.as_str() == to)
            .ok_or(Error::NotFound("to station not found on this train"))?;
        if from_idx >= to_idx {
            return Err(Error::Validation("from station must precede to station"));
        }

        let sale_start = MonthDay::from_mmdd(train.sale_start)?;
        let sale_end = MonthDay::from_mmdd(train.sale_end)?;
        let day_shift =
            (stations[from_idx].leaving_offset as i64 + train.start_time as i64).div_euclid(1440);
        let origin_date = date.add_days(-day_shift)?;
        if origin_date < sale_start || origin_date > sale_end {
            return Err(Error::Validation("date outside the train's sale window"));
        }

        let legs = stations.len() - 1;
        let day_index = sale_start.days_until(origin_date) as usize;
        let offset = day_index * legs + from_idx;
        let count = to_idx - from_idx;

        let current = self
            .tickets
            .read_range(train.ticket_bucket_id as u64, offset, count)?;
        let updated: Vec<i32> = current.iter().map(|v| v - num as i32).collect();
        self.tickets
            .update_range(train.ticket_bucket_id as u64, offset, count, &updated)?;
        let successful = updated.iter().all(|v| *v >= 0);

        let price = (stations[to_idx].price - stations[from_idx].price) * num as i64;
        Ok(BuyTicketOutcome {
            price,
            origin_date,
            successful,
            from_idx,
            to_idx,
            departure_offset: stations[from_idx].leaving_offset,
            arrival_offset: stations[to_idx].arrival_offset,
        })
    }

    /// Adds `num` back to every leg in `[from_idx, to_idx)` for
    /// `origin_date` (§4.7.3 `refundTicket`); unlike `buy_ticket` this is
    /// unconditional, since giving seats back can never overdraw.
    pub fn refund_ticket(
        &mut self,
        train_id: &str,
        origin_date: MonthDay,
        num: u32,
        from_idx: usize,
        to_idx: usize,
    ) -> Result<()> {
        let train = self
            .find_train(train_id)?
            .ok_or(Error::NotFound("train not found"))?;
        let sale_start = MonthDay::from_mmdd(train.sale_start)?;
        let legs = train.station_num as usize - 1;
        let day_index = sale_start.days_until(origin_date) as usize;
        let offset = day_index * legs + from_idx;
        let count = to_idx - from_idx;

        let current = self
            .tickets
            .read_range(train.ticket_bucket_id as u64, offset, count)?;
        let updated: Vec<i32> = current.iter().map(|v| v + num as i32).collect();
        self.tickets
            .update_range(train.ticket_bucket_id as u64, offset, count, &updated)?;
        Ok(())
    }

    /// Adds `delta` seats to every leg in `[from_idx, to_idx)` for
    /// `origin_date`, but only commits if every leg would stay non-negative
    /// (§4.7.3 `updateLeftSeats`, used by pending-order promotion and
    /// refunds — unlike `buy_ticket`, this is a proper check-then-write).
    pub fn update_left_seats(
        &mut self,
        train_id: &str,
        origin_date: MonthDay,
        from_idx: usize,
        to_idx: usize,
        delta: i32,
    ) -> Result<bool> {
        let train = self
            .find_train(train_id)?
            .ok_or(Error::NotFound("train not found"))?;
        let sale_start = MonthDay::from_mmdd(train.sale_start)?;
        let legs = train.station_num as usize - 1;
        let day_index = sale_start.days_until(origin_date) as usize;
        let offset = day_index * legs + from_idx;
        let count = to_idx - from_idx;

        let current = self
            .tickets
            .read_range(train.ticket_bucket_id as u64, offset, count)?;
        let updated: Vec<i32> = current.iter().map(|v| v + delta).collect();
        if !updated.iter().all(|v| *v >= 0) {
            return Ok(false);
        }
        self.tickets
            .update_range(train.ticket_bucket_id as u64, offset, count, &updated)?;
        Ok(true)
    }
}

fn sort_candidates(results: &mut [TicketCandidate], sort_by: SortBy) {
    match sort_by {
        SortBy::Time => {
            results.sort_by(|a, b| (a.duration_minutes, &a.train_id).cmp(&(b.duration_minutes, &b.train_id)))
        }
        SortBy::Cost => results.sort_by(|a, b| (a.price, &a.train_id).cmp(&(b.price, &b.train_id))),
    }
}

fn is_better(candidate: &TransferCandidate, incumbent: Option<&TransferCandidate>, sort_by: SortBy) -> bool {
    let Some(incumbent) = incumbent else {
        return true;
    };
    let total = |c: &TransferCandidate| (c.first.price + c.second.price, total_duration(c));
    let (c_price, c_duration) = total(candidate);
    let (i_price, i_duration) = total(incumbent);
    let key = |price: i64, duration: i64| match sort_by {
        SortBy::Cost => (price, duration),
        SortBy::Time => (duration, price),
    };
    let c_key = key(c_price, c_duration);
    let i_key = key(i_price, i_duration);
    if c_key != i_key {
        return c_key < i_key;
    }
    (&candidate.first.train_id, &candidate.second.train_id)
        < (&incumbent.first.train_id, &incumbent.second.train_id)
}

fn total_duration(c: &TransferCandidate) -> i64 {
    let start = Timestamp::new(c.first.departure.0, c.first.departure.1).raw_minutes();
    let end = Timestamp::new(c.second.arrival.0, c.second.arrival.1).raw_minutes();
    end - start
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::EngineConfig;

    fn open_service(dir: &tempfile::TempDir) -> TrainService {
        let engine = Engine::open(EngineConfig {
            data_dir: dir.path().to_path_buf(),
            ..EngineConfig::default()
        })
        .unwrap();
        TrainService::open(&engine).unwrap()
    }

    fn sample_train(svc: &mut TrainService) {
        svc.add_train(
            "G1",
            3,
            10,
            &["Beijing", "Shanghai", "Nanjing"],
            &[100, 50],
            DayMinutes::new(8 * 60).unwrap(),
            &[120, 60],
            &[10],
            MonthDay::new(6, 1).unwrap(),
            MonthDay::new(6, 5).unwrap(),
            b'G',
        )
        .unwrap();
    }

    #[test]
    fn release_then_query_shows_full_capacity() {
        let dir = tempfile::tempdir().unwrap();
        let mut svc = open_service(&dir);
        sample_train(&mut svc);
        svc.release_train("G1").unwrap();
        let date = MonthDay::new(6, 1).unwrap();
        let lines = svc.query_train("G1", date).unwrap();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].seats_remaining, Some(10));
        assert_eq!(lines[2].seats_remaining, None);
        assert_eq!(lines[2].price, 150);
    }

    #[test]
    fn buy_ticket_decrements_every_leg_in_range() {
        let dir = tempfile::tempdir().unwrap();
        let mut svc = open_service(&dir);
        sample_train(&mut svc);
        svc.release_train("G1").unwrap();
        let date = MonthDay::new(6, 1).unwrap();
        let result = svc
            .buy_ticket("G1", date, 4, "Beijing", "Nanjing")
            .unwrap();
        assert!(result.successful);
        assert_eq!(result.from_idx, 0);
        assert_eq!(result.to_idx, 2);
        assert_eq!(result.price, 150 * 4);
        let lines = svc.query_train("G1", date).unwrap();
        assert_eq!(lines[0].seats_remaining, Some(6));
        assert_eq!(lines[1].seats_remaining, Some(6));
    }

    #[test]
    fn buy_ticket_writes_even_when_it_overdraws() {
        let dir = tempfile::tempdir().unwrap();
        let mut svc = open_service(&dir);
        sample_train(&mut svc);
        svc.release_train("G1").unwrap();
        let date = MonthDay::new(6, 1).unwrap();
        let result = svc
            .buy_ticket("G1", date, 11, "Beijing", "Shanghai")
            .unwrap();
        assert!(!result.successful);
        // query_train clamps negative leg counts to 0 when reporting capacity.
        let lines = svc.query_train("G1", date).unwrap();
        assert_eq!(lines[0].seats_remaining, Some(0));
    }

    #[test]
    fn refund_ticket_adds_seats_back() {
        let dir = tempfile::tempdir().unwrap();
        let mut svc = open_service(&dir);
        sample_train(&mut svc);
        svc.release_train("G1").unwrap();
        let date = MonthDay::new(6, 1).unwrap();
        let result = svc
            .buy_ticket("G1", date, 4, "Beijing", "Nanjing")
            .unwrap();
        assert!(result.successful);
        svc.refund_ticket("G1", result.origin_date, 4, result.from_idx, result.to_idx)
            .unwrap();
        let lines = svc.query_train("G1", date).unwrap();
        assert_eq!(lines[0].seats_remaining, Some(10));
        assert_eq!(lines[1].seats_remaining, Some(10));
    }

    #[test]
    fn update_left_seats_refuses_to_commit_when_it_would_overdraw() {
        let dir = tempfile::tempdir().unwrap();
        let mut svc = open_service(&dir);
        sample_train(&mut svc);
        svc.release_train("G1").unwrap();
        let date = MonthDay::new(6, 1).unwrap();
        let ok = svc.update_left_seats("G1", date, 0, 1, -11).unwrap();
        assert!(!ok);
        let lines = svc.query_train("G1", date).unwrap();
        assert_eq!(lines[0].seats_remaining, Some(10));
    }

    #[test]
    fn query_ticket_finds_direct_train() {
        let dir = tempfile::tempdir().unwrap();
        let mut svc = open_service(&dir);
        sample_train(&mut svc);
        svc.release_train("G1").unwrap();
        let date = MonthDay::new(6, 1).unwrap();
        let results = svc
            .query_ticket("Beijing", "Nanjing", date, SortBy::Time)
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].train_id, "G1");
        assert_eq!(results[0].price, 150);
    }

    #[test]
    fn delete_train_rejects_released_trains() {
        let dir = tempfile::tempdir().unwrap();
        let mut svc = open_service(&dir);
        sample_train(&mut svc);
        svc.release_train("G1").unwrap();
        assert!(svc.delete_train("G1").is_err());
    }
}
