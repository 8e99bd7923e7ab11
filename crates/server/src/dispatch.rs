//! Turns a parsed [`crate::command::ParsedCommand`] into a service call and
//! a reply line (§6.2). One [`Dispatcher`] owns the three services and is
//! driven to completion by exactly one command at a time (§5): the stdin
//! loop in `main.rs` holds it directly, the HTTP façade in `http.rs` wraps
//! it in a `tokio::sync::Mutex`.

use model::date::{DayMinutes, MonthDay};
use reservation::{BuyOutcome, OrderService, SortBy, StationLine, TicketCandidate, TrainService, TransferCandidate, UserService};
use storage::Engine;

use crate::command::Verb;

pub struct Dispatcher {
    users: UserService,
    trains: TrainService,
    orders: OrderService,
}

impl Dispatcher {
    pub fn open(engine: &Engine) -> reservation::Result<Self> {
        Ok(Self {
            users: UserService::open(engine)?,
            trains: TrainService::open(engine)?,
            orders: OrderService::open(engine)?,
        })
    }

    /// Runs one command to completion, returning the reply body (without
    /// the `[<ts>]` prefix, which the caller attaches).
    pub fn execute(&mut self, timestamp: i64, verb: Verb) -> String {
        match verb {
            Verb::AddUser {
                cur,
                username,
                password,
                name,
                mail,
                privilege,
            } => ok_or_neg1(
                self.users
                    .add_user(&cur, &username, &password, &name, &mail, privilege),
            ),
            Verb::Login { username, password } => {
                ok_or_neg1(self.users.login(&username, &password))
            }
            Verb::Logout { username } => ok_or_neg1(self.users.logout(&username)),
            Verb::QueryProfile { cur, username } => {
                match self.users.query_profile(&cur, &username) {
                    Ok(u) => format!(
                        "{} {} {} {}",
                        u.username.as_str(),
                        u.name.as_str(),
                        u.mail.as_str(),
                        u.privilege
                    ),
                    Err(_) => "-1".to_string(),
                }
            }
            Verb::ModifyProfile {
                cur,
                username,
                password,
                name,
                mail,
                privilege,
            } => match self.users.modify_profile(
                &cur,
                &username,
                password.as_deref(),
                name.as_deref(),
                mail.as_deref(),
                privilege,
            ) {
                Ok(u) => format!(
                    "{} {} {} {}",
                    u.username.as_str(),
                    u.name.as_str(),
                    u.mail.as_str(),
                    u.privilege
                ),
                Err(_) => "-1".to_string(),
            },
            Verb::AddTrain {
                train_id,
                station_num,
                seat_num,
                stations,
                prices,
                start_time,
                travel_times,
                stopover_times,
                sale_start,
                sale_end,
                train_type,
            } => {
                let station_refs: Vec<&str> = stations.iter().map(String::as_str).collect();
                let result = (|| -> reservation::Result<()> {
                    let start = DayMinutes::parse(&start_time)?;
                    let sale_start = MonthDay::parse(&sale_start)?;
                    let sale_end = MonthDay::parse(&sale_end)?;
                    self.trains.add_train(
                        &train_id,
                        station_num,
                        seat_num,
                        &station_refs,
                        &prices,
                        start,
                        &travel_times,
                        &stopover_times,
                        sale_start,
                        sale_end,
                        train_type,
                    )
                })();
                ok_or_neg1(result)
            }
            Verb::DeleteTrain { train_id } => ok_or_neg1(self.trains.delete_train(&train_id)),
            Verb::ReleaseTrain { train_id } => ok_or_neg1(self.trains.release_train(&train_id)),
            Verb::QueryTrain { train_id, date } => {
                let result = (|| -> reservation::Result<Vec<StationLine>> {
                    let date = MonthDay::parse(&date)?;
                    self.trains.query_train(&train_id, date)
                })();
                match result {
                    Ok(lines) => format_station_lines(&lines),
                    Err(_) => "-1".to_string(),
                }
            }
            Verb::QueryTicket {
                from,
                to,
                date,
                sort_by,
            } => {
                let result = (|| -> reservation::Result<Vec<TicketCandidate>> {
                    let date = MonthDay::parse(&date)?;
                    let sort_by = parse_sort_by(&sort_by)?;
                    self.trains.query_ticket(&from, &to, date, sort_by)
                })();
                match result {
                    Ok(candidates) => format_ticket_candidates(&candidates),
                    Err(_) => "-1".to_string(),
                }
            }
            Verb::QueryTransfer {
                from,
                to,
                date,
                sort_by,
            } => {
                let result = (|| -> reservation::Result<Option<TransferCandidate>> {
                    let date = MonthDay::parse(&date)?;
                    let sort_by = parse_sort_by(&sort_by)?;
                    self.trains.query_transfer(&from, &to, date, sort_by)
                })();
                match result {
                    Ok(Some(c)) => format_transfer_candidate(&c),
                    Ok(None) => "0".to_string(),
                    Err(_) => "-1".to_string(),
                }
            }
            Verb::BuyTicket {
                username,
                train_id,
                date,
                num,
                from,
                to,
                queue_if_full,
            } => {
                let result = (|| -> reservation::Result<BuyOutcome> {
                    let date = MonthDay::parse(&date)?;
                    self.orders.buy_ticket(
                        &mut self.trains,
                        &username,
                        &train_id,
                        date,
                        num,
                        &from,
                        &to,
                        queue_if_full,
                        timestamp,
                    )
                })();
                match result {
                    Ok(BuyOutcome::Success { price }) => price.to_string(),
                    Ok(BuyOutcome::Queued) => "queue".to_string(),
                    Err(_) => "-1".to_string(),
                }
            }
            Verb::QueryOrder { username } => match self.orders.query_order(&username) {
                Ok(mut orders) => {
                    orders.reverse();
                    format_orders(&orders)
                }
                Err(_) => "-1".to_string(),
            },
            Verb::RefundTicket {
                username,
                order_index,
            } => ok_or_neg1(
                self.orders
                    .refund_ticket(&mut self.trains, &username, order_index),
            ),
            Verb::Clean => ok_or_neg1(self.users.clean()),
            Verb::Exit => "bye".to_string(),
        }
    }
}

fn ok_or_neg1<T>(result: reservation::Result<T>) -> String {
    match result {
        Ok(_) => "0".to_string(),
        Err(_) => "-1".to_string(),
    }
}

fn parse_sort_by(s: &str) -> reservation::Result<SortBy> {
    match s {
        "time" => Ok(SortBy::Time),
        "cost" => Ok(SortBy::Cost),
        _ => Err(reservation::Error::Validation("sortBy must be time or cost")),
    }
}

fn format_dt(dt: Option<(MonthDay, DayMinutes)>) -> String {
    match dt {
        Some((date, time)) => format!("{} {}", date.format(), time.format()),
        None => "xx-xx xx:xx".to_string(),
    }
}

fn format_station_lines(lines: &[StationLine]) -> String {
    lines
        .iter()
        .map(|l| {
            format!(
                "{} {} {} {} {}",
                l.name,
                format_dt(l.arrival),
                format_dt(l.leaving),
                l.price,
                l.seats_remaining
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "x".to_string())
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_ticket_candidate(c: &TicketCandidate) -> String {
    format!(
        "{} {} {} {} {} {} {}",
        c.train_id,
        c.from,
        format_dt(Some(c.departure)),
        c.to,
        format_dt(Some(c.arrival)),
        c.price,
        c.seats_available
    )
}

fn format_ticket_candidates(candidates: &[TicketCandidate]) -> String {
    let mut out = vec![candidates.len().to_string()];
    out.extend(candidates.iter().map(format_ticket_candidate));
    out.join("\n")
}

fn format_transfer_candidate(c: &TransferCandidate) -> String {
    format!(
        "{}\n{}",
        format_ticket_candidate(&c.first),
        format_ticket_candidate(&c.second)
    )
}

fn format_order_datetime(raw_minutes: i64) -> String {
    match model::date::Timestamp::from_raw_minutes(raw_minutes) {
        Ok((date, time)) => format!("{} {}", date.format(), time.format()),
        Err(_) => "xx-xx xx:xx".to_string(),
    }
}

fn format_orders(orders: &[model::Order]) -> String {
    let mut out = vec![orders.len().to_string()];
    out.extend(orders.iter().map(|o| {
        format!(
            "[{:?}] {} {} {} -> {} {} {} {}",
            o.status,
            o.train_id.as_str(),
            o.from_station.as_str(),
            format_order_datetime(o.departure_from_station),
            o.to_station.as_str(),
            format_order_datetime(o.arrival_at_station),
            o.price,
            o.num
        )
    }));
    out.join("\n")
}
