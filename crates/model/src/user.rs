//! The `User` entity (§3 "User"; §4.6). Persisted whole as the `Value` of
//! `users_user_*`'s `hash64(username) -> User` B+-tree — the tree already
//! gives durable storage for fixed-size records, so there is no separate
//! user data file (§6.1 lists only `users_user_*`).

use std::io::{self, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use storage::record::Codec;

use crate::fixed_str::FixedStr;

pub const USERNAME_LEN: usize = 32;
pub const NAME_LEN: usize = 32;
pub const MAIL_LEN: usize = 48;

/// *Usernames are unique. The first ever user gets privilege 10* (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct User {
    pub username: FixedStr<USERNAME_LEN>,
    /// `H(password)` only (§4.6) — never the plaintext.
    pub password_hash: u64,
    pub name: FixedStr<NAME_LEN>,
    pub mail: FixedStr<MAIL_LEN>,
    pub privilege: u8,
}

impl Codec for User {
    const WIDTH: usize = FixedStr::<USERNAME_LEN>::WIDTH
        + 8
        + FixedStr::<NAME_LEN>::WIDTH
        + FixedStr::<MAIL_LEN>::WIDTH
        + 1;

    fn encode<W: Write>(&self, w: &mut W) -> io::Result<()> {
        self.username.encode(w)?;
        w.write_u64::<LittleEndian>(self.password_hash)?;
        self.name.encode(w)?;
        self.mail.encode(w)?;
        w.write_u8(self.privilege)
    }

    fn decode<R: Read>(r: &mut R) -> io::Result<Self> {
        let username = FixedStr::decode(r)?;
        let password_hash = r.read_u64::<LittleEndian>()?;
        let name = FixedStr::decode(r)?;
        let mail = FixedStr::decode(r)?;
        let privilege = r.read_u8()?;
        Ok(Self {
            username,
            password_hash,
            name,
            mail,
            privilege,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let u = User {
            username: FixedStr::new("alice").unwrap(),
            password_hash: 12345,
            name: FixedStr::new("Alice A").unwrap(),
            mail: FixedStr::new("alice@example.com").unwrap(),
            privilege: 7,
        };
        let mut buf = Vec::new();
        u.encode(&mut buf).unwrap();
        let decoded = User::decode(&mut &buf[..]).unwrap();
        assert_eq!(decoded, u);
    }
}
