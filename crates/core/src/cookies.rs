//! Cookie jar holding the re-attachable session.
//!
//! Four scalar values survive process restarts: user, room, sid, rid. The
//! jar is a small JSON object in the user config dir; a missing or corrupt
//! file loads as an empty jar.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use chatyuk_protocol::SavedSession;
use chatyuk_runtime::Result;

/// Cookie key for the logged-in username.
pub const USER: &str = "chatyuk_user";
/// Cookie key for the joined room.
pub const ROOM: &str = "chatyuk_room";
/// Cookie key for the session id.
pub const SID: &str = "chatyuk_sid";
/// Cookie key for the request id counter.
pub const RID: &str = "chatyuk_rid";

#[derive(Debug)]
pub struct CookieJar {
    path: PathBuf,
    values: HashMap<String, String>,
}

impl CookieJar {
    /// Load the jar at the default location
    /// (`$XDG_CONFIG_HOME/chatyuk/cookies.json`, HOME fallback).
    pub fn open_default() -> Self {
        Self::load(default_jar_path())
    }

    /// Load a jar from `path`. Unreadable or malformed files yield an
    /// empty jar.
    pub fn load(path: PathBuf) -> Self {
        let values = fs::read_to_string(&path)
            .ok()
            .and_then(|content| serde_json::from_str(&content).ok())
            .unwrap_or_default();

        Self { path, values }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.values.insert(key.to_string(), value.into());
    }

    pub fn remove(&mut self, key: &str) {
        self.values.remove(key);
    }

    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Persist the jar, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(&self.values)?;
        fs::write(&self.path, json)?;
        Ok(())
    }

    /// The session stored in this jar, if one is restorable.
    ///
    /// A session is restorable iff the sid and rid cookies are both
    /// present (and the rid parses); user and room default to empty.
    pub fn saved_session(&self) -> Option<SavedSession> {
        let sid = self.get(SID)?;
        let rid = self.get(RID)?.parse().ok()?;

        Some(SavedSession {
            user: self.get(USER).unwrap_or_default().to_string(),
            room: self.get(ROOM).unwrap_or_default().to_string(),
            sid: sid.to_string(),
            rid,
        })
    }

    /// Write the four session cookies and persist.
    pub fn store_session(&mut self, session: &SavedSession) -> Result<()> {
        self.set(USER, &session.user);
        self.set(ROOM, &session.room);
        self.set(SID, &session.sid);
        self.set(RID, session.rid.to_string());
        self.save()
    }

    /// Remove the four session cookies and persist.
    pub fn clear_session(&mut self) -> Result<()> {
        for key in [USER, ROOM, SID, RID] {
            self.remove(key);
        }
        self.save()
    }
}

fn default_jar_path() -> PathBuf {
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))
        .unwrap_or_else(|| PathBuf::from("."));
    base.join("chatyuk").join("cookies.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_jar() -> (tempfile::TempDir, CookieJar) {
        let dir = tempfile::tempdir().unwrap();
        let jar = CookieJar::load(dir.path().join("cookies.json"));
        (dir, jar)
    }

    #[test]
    fn store_session_writes_the_four_cookie_keys() {
        let (_dir, mut jar) = temp_jar();

        jar.store_session(&SavedSession {
            user: "fakeuser".into(),
            room: "fakeroom".into(),
            sid: "fakesid-123123".into(),
            rid: 999,
        })
        .unwrap();

        assert_eq!(jar.get("chatyuk_user"), Some("fakeuser"));
        assert_eq!(jar.get("chatyuk_room"), Some("fakeroom"));
        assert_eq!(jar.get("chatyuk_sid"), Some("fakesid-123123"));
        assert_eq!(jar.get("chatyuk_rid"), Some("999"));
    }

    #[test]
    fn stored_session_survives_a_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.json");

        let mut jar = CookieJar::load(path.clone());
        let session = SavedSession {
            user: "fakeuser".into(),
            room: "fakeroom".into(),
            sid: "s123".into(),
            rid: 123,
        };
        jar.store_session(&session).unwrap();

        let reloaded = CookieJar::load(path);
        assert_eq!(reloaded.saved_session(), Some(session));
    }

    #[test]
    fn missing_sid_or_rid_means_no_restorable_session() {
        let (_dir, mut jar) = temp_jar();
        assert!(jar.saved_session().is_none());

        jar.set(SID, "s123");
        assert!(jar.saved_session().is_none());

        jar.set(RID, "not-a-number");
        assert!(jar.saved_session().is_none());

        jar.set(RID, "123");
        assert!(jar.saved_session().is_some());
    }

    #[test]
    fn clear_session_removes_the_cookies() {
        let (_dir, mut jar) = temp_jar();

        jar.store_session(&SavedSession {
            user: "fakeuser".into(),
            room: "fakeroom".into(),
            sid: "s123".into(),
            rid: 123,
        })
        .unwrap();
        jar.clear_session().unwrap();

        assert!(!jar.has(USER));
        assert!(!jar.has(ROOM));
        assert!(!jar.has(SID));
        assert!(!jar.has(RID));
        assert!(jar.saved_session().is_none());
    }

    #[test]
    fn corrupt_jar_loads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.json");
        fs::write(&path, "{ not json").unwrap();

        let jar = CookieJar::load(path);
        assert!(jar.saved_session().is_none());
        assert!(!jar.has(USER));
    }
}
