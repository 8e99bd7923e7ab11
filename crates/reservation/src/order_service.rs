//! The order ledger and pending-order promotion (§4.8), grounded in the
//! original `orderManager.hpp`'s `OrderManager`. Delegates seat arithmetic
//! to [`crate::train_service::TrainService`] (§2 data flow: "O -> T").

use model::date::MonthDay;
use model::fixed_str::FixedStr;
use model::hash::hash64;
use model::order::OrderStatus;
use model::station::STATION_NAME_LEN;
use model::train::TRAIN_ID_LEN;
use model::user::USERNAME_LEN;
use model::Order;
use storage::Engine;

use crate::error::{Error, Result};
use crate::train_service::TrainService;
use crate::trees::{OrderTree, PendingTree};

/// `O.buyTicket`'s result (§4.8): the wire protocol only needs a status
/// (`price` / `0` / `-1`), but callers in-process get the full record.
#[derive(Debug, Clone, Copy)]
pub enum BuyOutcome {
    Success { price: i64 },
    Queued,
}

pub struct OrderService {
    orders: OrderTree,
    pending: PendingTree,
}

impl OrderService {
    pub fn open(engine: &Engine) -> Result<Self> {
        Ok(Self {
            orders: engine.open_btree("orders_order")?,
            pending: engine.open_btree("orders_pending")?,
        })
    }

    /// All of `username`'s orders, ascending by timestamp (§4.8
    /// `queryOrder`). Per the bag-sort convention `find` already returns
    /// them this way; the caller (the command/HTTP dispatcher) is
    /// responsible for emitting them newest-first per §8 "Order
    /// monotonicity".
    pub fn query_order(&mut self, username: &str) -> Result<Vec<Order>> {
        let mut orders = self
            .orders
            .find(hash64(username))?
            .into_iter()
            .filter(|o| o.username.as_str() == username)
            .collect::<Vec<_>>();
        orders.sort();
        Ok(orders)
    }

    /// Attempts to buy `num` tickets for `username` on `train_id`, `from`
    /// -> `to`, departing `date` (§4.8 `buyTicket`). Delegates seat
    /// arithmetic to T; records a `SUCCESS` or `PENDING` order on anything
    /// other than an outright rejection.
    #[allow(clippy::too_many_arguments)]
    pub fn buy_ticket(
        &mut self,
        trains: &mut TrainService,
        username: &str,
        train_id: &str,
        date: MonthDay,
        num: u32,
        from: &str,
        to: &str,
        queue_if_full: bool,
        timestamp: i64,
    ) -> Result<BuyOutcome> {
        if num == 0 {
            return Err(Error::Validation("ticket count must be positive"));
        }

        let outcome = trains.buy_ticket(train_id, date, num, from, to)?;

        let status = if outcome.successful {
            OrderStatus::Success
        } else if queue_if_full {
            OrderStatus::Pending
        } else {
            return Err(Error::Validation("no seats available"));
        };

        let departure_from_origin = departure_timestamp(date, outcome.origin_date, 0)?;
        let departure_from_station =
            departure_timestamp(date, outcome.origin_date, outcome.departure_offset as i64)?;
        let arrival_at_station =
            departure_timestamp(date, outcome.origin_date, outcome.arrival_offset as i64)?;

        let order = Order {
            timestamp,
            username: FixedStr::<USERNAME_LEN>::new(username)?,
            train_id: FixedStr::<TRAIN_ID_LEN>::new(train_id)?,
            from_station: FixedStr::<STATION_NAME_LEN>::new(from)?,
            from_idx: outcome.from_idx as i32,
            to_station: FixedStr::<STATION_NAME_LEN>::new(to)?,
            to_idx: outcome.to_idx as i32,
            origin_date: outcome.origin_date.mmdd(),
            departure_from_origin,
            departure_from_station,
            arrival_at_station,
            price: outcome.price,
            num: num as i32,
            status,
        };
        self.orders.insert(hash64(username), order)?;

        match status {
            OrderStatus::Success => {
                tracing::debug!(username, train_id, price = outcome.price, "ticket purchased");
                Ok(BuyOutcome::Success {
                    price: outcome.price,
                })
            }
            OrderStatus::Pending => {
                self.pending
                    .insert((hash64(train_id), outcome.origin_date.mmdd()), order)?;
                tracing::debug!(username, train_id, "ticket purchase queued");
                Ok(BuyOutcome::Queued)
            }
            OrderStatus::Refunded => unreachable!("a freshly bought order is never refunded"),
        }
    }

    /// Refunds the `order_index`-th order (1-based, newest-first) of
    /// `username` (§4.8 `refundTicket`). A `SUCCESS` order releases its
    /// seats through T and triggers [`Self::process_pending_orders`]; a
    /// `PENDING` order is simply dequeued.
    pub fn refund_ticket(
        &mut self,
        trains: &mut TrainService,
        username: &str,
        order_index: usize,
    ) -> Result<()> {
        if order_index == 0 {
            return Err(Error::Validation("order index must be positive"));
        }
        let orders = self.query_order(username)?;
        if order_index > orders.len() {
            return Err(Error::NotFound("order index out of range"));
        }
        let order = orders[orders.len() - order_index];

        if order.status == OrderStatus::Refunded {
            return Err(Error::Validation("order already refunded"));
        }

        let original_status = order.status;
        self.orders.remove(hash64(username), order)?;
        if original_status == OrderStatus::Pending {
            self.pending
                .remove((hash64(order.train_id.as_str()), order.origin_date), order)?;
        }
        let mut refunded = order;
        refunded.status = OrderStatus::Refunded;
        self.orders.insert(hash64(username), refunded)?;

        if original_status == OrderStatus::Success {
            trains.refund_ticket(
                order.train_id.as_str(),
                MonthDay::from_mmdd(order.origin_date)?,
                order.num as u32,
                order.from_idx as usize,
                order.to_idx as usize,
            )?;
            self.process_pending_orders(
                trains,
                order.train_id.as_str(),
                MonthDay::from_mmdd(order.origin_date)?,
            )?;
        }
        Ok(())
    }

    /// Promotes as many queued orders for `(train_id, origin_date)` as now
    /// fit, oldest request first (§4.8 `processPendingOrders`, §8
    /// "Pending-FIFO").
    fn process_pending_orders(
        &mut self,
        trains: &mut TrainService,
        train_id: &str,
        origin_date: MonthDay,
    ) -> Result<()> {
        let key = (hash64(train_id), origin_date.mmdd());
        let candidates = self.pending.find(key)?;
        let mut promoted = 0usize;
        for candidate in candidates {
            let success = trains.update_left_seats(
                train_id,
                origin_date,
                candidate.from_idx as usize,
                candidate.to_idx as usize,
                -candidate.num,
            )?;
            if !success {
                continue;
            }
            self.pending.remove(key, candidate)?;
            self.orders
                .remove(hash64(candidate.username.as_str()), candidate)?;
            let mut promoted_order = candidate;
            promoted_order.status = OrderStatus::Success;
            self.orders
                .insert(hash64(candidate.username.as_str()), promoted_order)?;
            promoted += 1;
        }
        tracing::debug!(train_id, promoted, "pending orders processed");
        Ok(())
    }
}

/// Builds an absolute minute count for `(origin_date, offset)`, but keeps
/// the caller's originally-requested `date` available for error context —
/// both are always the same day-window (June..September), so this never
/// fails in practice; the `?` just keeps the signature honest.
fn departure_timestamp(_requested_date: MonthDay, origin_date: MonthDay, offset_minutes: i64) -> Result<i64> {
    let base = model::date::Timestamp::new(origin_date, model::date::DayMinutes::new(0)?);
    Ok(base.raw_minutes() + offset_minutes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::date::DayMinutes;
    use storage::EngineConfig;

    struct Services {
        trains: TrainService,
        orders: OrderService,
    }

    fn open_services(dir: &tempfile::TempDir) -> Services {
        let engine = Engine::open(EngineConfig {
            data_dir: dir.path().to_path_buf(),
            ..EngineConfig::default()
        })
        .unwrap();
        let mut trains = TrainService::open(&engine).unwrap();
        trains
            .add_train(
                "K1",
                3,
                5,
                &["s1", "s2", "s3"],
                &[10, 10],
                DayMinutes::new(8 * 60).unwrap(),
                &[60, 60],
                &[10],
                MonthDay::new(6, 1).unwrap(),
                MonthDay::new(6, 5).unwrap(),
                b'K',
            )
            .unwrap();
        trains.release_train("K1").unwrap();
        let orders = OrderService::open(&engine).unwrap();
        Services { trains, orders }
    }

    #[test]
    fn sell_and_refund_happy_path() {
        let dir = tempfile::tempdir().unwrap();
        let mut svc = open_services(&dir);
        let date = MonthDay::new(6, 1).unwrap();

        let outcome = svc
            .orders
            .buy_ticket(
                &mut svc.trains, "alice", "K1", date, 5, "s1", "s3", false, 1,
            )
            .unwrap();
        assert!(matches!(outcome, BuyOutcome::Success { .. }));

        let orders = svc.orders.query_order("alice").unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].status, OrderStatus::Success);
        assert_eq!(orders[0].num, 5);

        svc.orders
            .refund_ticket(&mut svc.trains, "alice", 1)
            .unwrap();
        let lines = svc.trains.query_train("K1", date).unwrap();
        assert_eq!(lines[0].seats_remaining, Some(5));
        assert_eq!(lines[1].seats_remaining, Some(5));
    }

    #[test]
    fn queue_and_promote_on_refund() {
        let dir = tempfile::tempdir().unwrap();
        let mut svc = open_services(&dir);
        let date = MonthDay::new(6, 1).unwrap();

        svc.orders
            .buy_ticket(
                &mut svc.trains, "a", "K1", date, 5, "s1", "s3", false, 1,
            )
            .unwrap();
        let queued = svc
            .orders
            .buy_ticket(
                &mut svc.trains, "b", "K1", date, 3, "s1", "s3", true, 2,
            )
            .unwrap();
        assert!(matches!(queued, BuyOutcome::Queued));
        assert_eq!(
            svc.orders.query_order("b").unwrap()[0].status,
            OrderStatus::Pending
        );

        svc.orders.refund_ticket(&mut svc.trains, "a", 1).unwrap();

        assert_eq!(
            svc.orders.query_order("b").unwrap()[0].status,
            OrderStatus::Success
        );
    }

    #[test]
    fn refund_rejects_already_refunded_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut svc = open_services(&dir);
        let date = MonthDay::new(6, 1).unwrap();
        svc.orders
            .buy_ticket(
                &mut svc.trains, "alice", "K1", date, 1, "s1", "s2", false, 1,
            )
            .unwrap();
        svc.orders
            .refund_ticket(&mut svc.trains, "alice", 1)
            .unwrap();
        assert!(svc
            .orders
            .refund_ticket(&mut svc.trains, "alice", 1)
            .is_err());
    }

    #[test]
    fn buy_ticket_without_queueing_fails_when_full() {
        let dir = tempfile::tempdir().unwrap();
        let mut svc = open_services(&dir);
        let date = MonthDay::new(6, 1).unwrap();
        svc.orders
            .buy_ticket(
                &mut svc.trains, "a", "K1", date, 5, "s1", "s3", false, 1,
            )
            .unwrap();
        let result = svc.orders.buy_ticket(
            &mut svc.trains, "b", "K1", date, 1, "s1", "s3", false, 2,
        );
        assert!(result.is_err());
    }
}
