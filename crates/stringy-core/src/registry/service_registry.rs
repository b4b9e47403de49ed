//! SQLite-backed registry of declared interfaces and running instances.

use crate::config::RegistryConfig;
use crate::types::{InterfaceDescriptor, InterfaceVersion};
use crate::{Result, StringyError};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// A declared interface: an instance of it is expected to exist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterfaceEntry {
    pub descriptor: InterfaceDescriptor,
    pub declared_at: String,
}

/// A running instance entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceEntry {
    pub descriptor: InterfaceDescriptor,
    pub pid: u32,
    pub port: u16,
    pub started_at: String,
    /// Crate version of the process hosting the instance.
    pub host_version: Option<String>,
}

impl InstanceEntry {
    /// Loopback endpoint of the instance.
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::LOCALHOST, self.port))
    }
}

/// Result of looking up a descriptor.
#[derive(Debug, Clone)]
pub enum Lookup {
    /// Never declared; no instance is expected to ever exist.
    Undeclared,
    /// Declared, with the live instance entry if one is registered.
    Declared(Option<InstanceEntry>),
}

/// SQLite-backed registry for service discovery.
///
/// Uses WAL mode for safe concurrent access across processes and
/// `Arc<Mutex<Connection>>` for thread safety within a process.
#[derive(Clone)]
pub struct ServiceRegistry {
    conn: Arc<Mutex<Connection>>,
}

impl ServiceRegistry {
    /// Open the registry at the default platform location.
    pub fn open() -> Result<Self> {
        let db_path = crate::platform::registry_db_path()?;
        Self::open_at(&db_path)
    }

    /// Open the registry at a specific path.
    ///
    /// Creates the database and parent directories if they don't exist.
    pub fn open_at(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| StringyError::Io {
                    message: format!(
                        "Failed to create registry directory: {}",
                        parent.display()
                    ),
                    path: Some(parent.to_path_buf()),
                    source: Some(e),
                })?;
            }
        }

        let conn = Connection::open(db_path)?;
        Self::configure_connection(&conn)?;
        Self::ensure_schema(&conn)?;

        debug!("Opened service registry at {}", db_path.display());

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn configure_connection(conn: &Connection) -> Result<()> {
        conn.execute_batch(&format!(
            "PRAGMA journal_mode=WAL;\n\
             PRAGMA busy_timeout={};\n\
             PRAGMA synchronous=NORMAL;\n\
             PRAGMA temp_store=MEMORY;",
            RegistryConfig::BUSY_TIMEOUT_MS,
        ))?;
        Ok(())
    }

    fn ensure_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS interfaces (
                name TEXT NOT NULL,
                version TEXT NOT NULL,
                declared_at TEXT NOT NULL,
                PRIMARY KEY (name, version)
            );

            CREATE TABLE IF NOT EXISTS instances (
                name TEXT NOT NULL,
                version TEXT NOT NULL,
                pid INTEGER NOT NULL,
                port INTEGER NOT NULL,
                started_at TEXT NOT NULL,
                host_version TEXT,
                PRIMARY KEY (name, version)
            );",
        )?;
        Ok(())
    }

    fn lock_conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StringyError::Database {
            message: "Failed to acquire registry connection lock".to_string(),
            source: None,
        })
    }

    // ========================================
    // Interface declarations
    // ========================================

    /// Declare that an interface is expected to exist. Idempotent.
    pub fn declare_interface(&self, descriptor: &InterfaceDescriptor) -> Result<InterfaceEntry> {
        let conn = self.lock_conn()?;
        Self::declare_locked(&conn, descriptor)?;

        let declared_at: String = conn.query_row(
            "SELECT declared_at FROM interfaces WHERE name = ?1 AND version = ?2",
            params![descriptor.name, descriptor.version.to_string()],
            |row| row.get(0),
        )?;

        Ok(InterfaceEntry {
            descriptor: descriptor.clone(),
            declared_at,
        })
    }

    fn declare_locked(conn: &Connection, descriptor: &InterfaceDescriptor) -> Result<()> {
        let rows = conn.execute(
            "INSERT OR IGNORE INTO interfaces (name, version, declared_at) VALUES (?1, ?2, ?3)",
            params![
                descriptor.name,
                descriptor.version.to_string(),
                Utc::now().to_rfc3339()
            ],
        )?;
        if rows > 0 {
            debug!("Declared interface {}", descriptor);
        }
        Ok(())
    }

    /// Remove an interface declaration and any instance registered for it.
    pub fn withdraw_interface(&self, descriptor: &InterfaceDescriptor) -> Result<bool> {
        let conn = self.lock_conn()?;
        let version = descriptor.version.to_string();

        conn.execute(
            "DELETE FROM instances WHERE name = ?1 AND version = ?2",
            params![descriptor.name, version],
        )?;
        let rows = conn.execute(
            "DELETE FROM interfaces WHERE name = ?1 AND version = ?2",
            params![descriptor.name, version],
        )?;

        if rows > 0 {
            debug!("Withdrew interface {}", descriptor);
        }

        Ok(rows > 0)
    }

    /// List all declared interfaces.
    pub fn list_interfaces(&self) -> Result<Vec<InterfaceEntry>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(
            "SELECT name, version, declared_at FROM interfaces ORDER BY name, version",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (name, version, declared_at) = row?;
            entries.push(InterfaceEntry {
                descriptor: descriptor_from(name, &version)?,
                declared_at,
            });
        }

        Ok(entries)
    }

    // ========================================
    // Instance tracking
    // ========================================

    /// Register the running instance for a descriptor, replacing any previous one.
    ///
    /// Declares the interface if needed.
    pub fn register_instance(&self, descriptor: &InterfaceDescriptor, pid: u32, port: u16) -> Result<()> {
        let conn = self.lock_conn()?;
        Self::declare_locked(&conn, descriptor)?;

        let now = Utc::now().to_rfc3339();
        let host_version = env!("CARGO_PKG_VERSION").to_string();

        conn.execute(
            "INSERT INTO instances (name, version, pid, port, started_at, host_version)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(name, version) DO UPDATE SET
                 pid=excluded.pid,
                 port=excluded.port,
                 started_at=excluded.started_at,
                 host_version=excluded.host_version",
            params![
                descriptor.name,
                descriptor.version.to_string(),
                pid,
                port,
                now,
                host_version
            ],
        )?;

        debug!(
            "Registered instance for {}: PID {} on port {}",
            descriptor, pid, port
        );

        Ok(())
    }

    /// Unregister the running instance for a descriptor.
    pub fn unregister_instance(&self, descriptor: &InterfaceDescriptor) -> Result<bool> {
        let conn = self.lock_conn()?;
        let rows = conn.execute(
            "DELETE FROM instances WHERE name = ?1 AND version = ?2",
            params![descriptor.name, descriptor.version.to_string()],
        )?;

        if rows > 0 {
            debug!("Unregistered instance for {}", descriptor);
        }

        Ok(rows > 0)
    }

    /// Unregister the instance only if it is still owned by `pid`.
    ///
    /// A host shutting down must not remove a replacement registered by
    /// another process in the meantime.
    pub fn unregister_instance_for_pid(&self, descriptor: &InterfaceDescriptor, pid: u32) -> Result<bool> {
        let conn = self.lock_conn()?;
        let rows = conn.execute(
            "DELETE FROM instances WHERE name = ?1 AND version = ?2 AND pid = ?3",
            params![descriptor.name, descriptor.version.to_string(), pid],
        )?;
        Ok(rows > 0)
    }

    /// Get the running instance for a descriptor.
    pub fn get_instance(&self, descriptor: &InterfaceDescriptor) -> Result<Option<InstanceEntry>> {
        let conn = self.lock_conn()?;
        Self::get_instance_locked(&conn, descriptor)
    }

    fn get_instance_locked(
        conn: &Connection,
        descriptor: &InterfaceDescriptor,
    ) -> Result<Option<InstanceEntry>> {
        let result = conn
            .query_row(
                "SELECT pid, port, started_at, host_version
                 FROM instances WHERE name = ?1 AND version = ?2",
                params![descriptor.name, descriptor.version.to_string()],
                |row| {
                    Ok(InstanceEntry {
                        descriptor: descriptor.clone(),
                        pid: row.get(0)?,
                        port: row.get(1)?,
                        started_at: row.get(2)?,
                        host_version: row.get(3)?,
                    })
                },
            )
            .optional()?;

        Ok(result)
    }

    /// Look up a descriptor: undeclared, or declared with its instance (if any).
    pub fn lookup(&self, descriptor: &InterfaceDescriptor) -> Result<Lookup> {
        let conn = self.lock_conn()?;

        let declared: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM interfaces WHERE name = ?1 AND version = ?2",
                params![descriptor.name, descriptor.version.to_string()],
                |row| row.get(0),
            )
            .optional()?;

        if declared.is_none() {
            return Ok(Lookup::Undeclared);
        }

        Ok(Lookup::Declared(Self::get_instance_locked(&conn, descriptor)?))
    }

    /// Remove instance entries whose process is dead.
    pub fn cleanup_stale(&self) -> Result<usize> {
        let conn = self.lock_conn()?;

        let mut stmt = conn.prepare("SELECT name, version, pid FROM instances")?;
        let entries: Vec<(String, String, u32)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
            .filter_map(|r| r.ok())
            .collect();
        drop(stmt);

        let mut removed = 0;
        for (name, version, pid) in &entries {
            if !crate::platform::is_process_alive(*pid) {
                conn.execute(
                    "DELETE FROM instances WHERE name = ?1 AND version = ?2 AND pid = ?3",
                    params![name, version, pid],
                )?;
                removed += 1;
                warn!("Cleaned up stale instance {}@{}: PID {} (dead)", name, version, pid);
            }
        }

        Ok(removed)
    }
}

fn descriptor_from(name: String, version: &str) -> Result<InterfaceDescriptor> {
    let version: InterfaceVersion = version.parse()?;
    Ok(InterfaceDescriptor::new(name, version))
}
