//! The user registry (§4.6): a hash-indexed user B+-tree plus an in-memory
//! login table, grounded in the original `userManager.hpp`'s `UserManager`.

use std::collections::HashMap;

use model::fixed_str::FixedStr;
use model::hash::hash64;
use model::user::{MAIL_LEN, NAME_LEN, USERNAME_LEN};
use model::User;
use storage::Engine;

use crate::error::{Error, Result};
use crate::trees::UserTree;

pub struct UserService {
    users: UserTree,
    /// username -> privilege captured at login time (§3 "Login entry").
    logged_in: HashMap<String, u8>,
}

impl UserService {
    pub fn open(engine: &Engine) -> Result<Self> {
        let users: UserTree = engine.open_btree("users_user")?;
        Ok(Self {
            users,
            logged_in: HashMap::new(),
        })
    }

    pub fn is_logged_in(&self, username: &str) -> bool {
        self.logged_in.contains_key(username)
    }

    /// The privilege level captured when `username` logged in, or `None` if
    /// not currently logged in (source: `getPrivilege`, returns -1 when
    /// absent — represented here as `Option` instead of a sentinel).
    fn login_privilege(&self, username: &str) -> Option<u8> {
        self.logged_in.get(username).copied()
    }

    fn find_user(&mut self, username: &str) -> Result<Option<User>> {
        let key = hash64(username);
        let candidates = self.users.find(key)?;
        Ok(candidates
            .into_iter()
            .find(|u| u.username.as_str() == username))
    }

    pub fn add_user(
        &mut self,
        cur_user: &str,
        username: &str,
        password: &str,
        name: &str,
        mail: &str,
        privilege: u8,
    ) -> Result<()> {
        if self.find_user(username)?.is_some() {
            return Err(Error::Validation("username already exists"));
        }

        let is_first = self.users.is_empty()?;
        let privilege = if is_first {
            10
        } else {
            if !self.is_logged_in(cur_user) {
                return Err(Error::Acl);
            }
            let cur_priv = self.login_privilege(cur_user).ok_or(Error::Acl)?;
            if cur_priv <= privilege {
                return Err(Error::Acl);
            }
            privilege
        };

        let user = User {
            username: FixedStr::<USERNAME_LEN>::new(username)?,
            password_hash: hash64(password),
            name: FixedStr::<NAME_LEN>::new(name)?,
            mail: FixedStr::<MAIL_LEN>::new(mail)?,
            privilege,
        };
        self.users.insert(hash64(username), user)?;
        tracing::debug!(username, privilege, "user added");
        Ok(())
    }

    pub fn login(&mut self, username: &str, password: &str) -> Result<()> {
        let user = self
            .find_user(username)?
            .ok_or(Error::Validation("no such user"))?;
        if user.password_hash != hash64(password) {
            return Err(Error::Validation("wrong password"));
        }
        if self.is_logged_in(username) {
            return Err(Error::Validation("already logged in"));
        }
        self.logged_in.insert(username.to_string(), user.privilege);
        Ok(())
    }

    pub fn logout(&mut self, username: &str) -> Result<()> {
        if self.logged_in.remove(username).is_none() {
            return Err(Error::Validation("not logged in"));
        }
        Ok(())
    }

    pub fn query_profile(&mut self, cur_user: &str, username: &str) -> Result<User> {
        if !self.is_logged_in(cur_user) {
            return Err(Error::Acl);
        }
        let user = self
            .find_user(username)?
            .ok_or(Error::NotFound("user not found"))?;
        if cur_user != username {
            let cur_priv = self.login_privilege(cur_user).ok_or(Error::Acl)?;
            if cur_priv <= user.privilege {
                return Err(Error::Acl);
            }
        }
        Ok(user)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn modify_profile(
        &mut self,
        cur_user: &str,
        username: &str,
        password: Option<&str>,
        name: Option<&str>,
        mail: Option<&str>,
        privilege: Option<u8>,
    ) -> Result<User> {
        if !self.is_logged_in(cur_user) {
            return Err(Error::Acl);
        }
        let old = self
            .find_user(username)?
            .ok_or(Error::NotFound("user not found"))?;
        if cur_user != username {
            let cur_priv = self.login_privilege(cur_user).ok_or(Error::Acl)?;
            if cur_priv <= old.privilege {
                return Err(Error::Acl);
            }
        }
        if let Some(new_priv) = privilege {
            let cur_priv = self.login_privilege(cur_user).ok_or(Error::Acl)?;
            if cur_priv <= new_priv {
                return Err(Error::Acl);
            }
        }

        let mut modified = old;
        if let Some(password) = password {
            modified.password_hash = hash64(password);
        }
        if let Some(name) = name {
            modified.name = FixedStr::<NAME_LEN>::new(name)?;
        }
        if let Some(mail) = mail {
            modified.mail = FixedStr::<MAIL_LEN>::new(mail)?;
        }
        if let Some(new_priv) = privilege {
            modified.privilege = new_priv;
        }

        let key = hash64(username);
        self.users.remove(key, old)?;
        self.users.insert(key, modified)?;
        Ok(modified)
    }

    /// Wipes the login table and the user store (§4.6 `clean`).
    pub fn clean(&mut self) -> Result<()> {
        self.logged_in.clear();
        self.users.clear()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::EngineConfig;

    fn open_service(dir: &tempfile::TempDir) -> UserService {
        let engine = Engine::open(EngineConfig {
            data_dir: dir.path().to_path_buf(),
            ..EngineConfig::default()
        })
        .unwrap();
        UserService::open(&engine).unwrap()
    }

    #[test]
    fn first_user_forces_privilege_ten() {
        let dir = tempfile::tempdir().unwrap();
        let mut svc = open_service(&dir);
        svc.add_user("anybody", "root", "r00t", "Ro", "r@x", 3)
            .unwrap();
        svc.login("root", "r00t").unwrap();
        let profile = svc.query_profile("root", "root").unwrap();
        assert_eq!(profile.privilege, 10);
    }

    #[test]
    fn second_login_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut svc = open_service(&dir);
        svc.add_user("anybody", "root", "r00t", "Ro", "r@x", 3)
            .unwrap();
        svc.login("root", "r00t").unwrap();
        assert!(svc.login("root", "r00t").is_err());
    }

    #[test]
    fn adding_user_requires_higher_privilege() {
        let dir = tempfile::tempdir().unwrap();
        let mut svc = open_service(&dir);
        svc.add_user("anybody", "root", "r00t", "Ro", "r@x", 3)
            .unwrap();
        svc.login("root", "r00t").unwrap();
        svc.add_user("root", "alice", "pw", "Alice", "a@x", 5)
            .unwrap();
        svc.login("alice", "pw").unwrap();
        assert!(svc
            .add_user("alice", "bob", "pw", "Bob", "b@x", 8)
            .is_err());
    }
}
