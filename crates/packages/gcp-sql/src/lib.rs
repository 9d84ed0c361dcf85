#![deny(clippy::all)]
#![forbid(unsafe_code)]

//! JDBC driver metadata for the relational backends Cloud SQL offers.
//!
//! Each [`DatabaseType`] carries the driver class name and a connection URL
//! template with two `%s` slots: the database name, then the instance
//! connection name (`project:region:instance`).

use gcp_error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const SLOT: &str = "%s";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    MySql,
    #[serde(alias = "postgres")]
    Postgresql,
}

impl DatabaseType {
    pub const ALL: [DatabaseType; 2] = [DatabaseType::MySql, DatabaseType::Postgresql];

    pub fn jdbc_driver_name(&self) -> &'static str {
        match self {
            Self::MySql => "com.mysql.cj.jdbc.Driver",
            Self::Postgresql => "org.postgresql.Driver",
        }
    }

    pub fn jdbc_url_template(&self) -> &'static str {
        match self {
            Self::MySql => {
                "jdbc:mysql://google/%s?socketFactory=com.google.cloud.sql.mysql.SocketFactory&cloudSqlInstance=%s"
            }
            Self::Postgresql => {
                "jdbc:postgresql://google/%s?socketFactory=com.google.cloud.sql.postgres.SocketFactory&cloudSqlInstance=%s"
            }
        }
    }

    /// (driver class name, URL template)
    pub fn resolve(&self) -> (&'static str, &'static str) {
        (self.jdbc_driver_name(), self.jdbc_url_template())
    }

    /// Fills the template with `database_name` and `instance_connection_name`, in that order.
    ///
    /// The result is not validated.
    pub fn jdbc_url(&self, database_name: &str, instance_connection_name: &str) -> String {
        let template = self.jdbc_url_template();
        let mut url = String::with_capacity(
            template.len() + database_name.len() + instance_connection_name.len(),
        );
        let mut values = [database_name, instance_connection_name].into_iter();
        let mut parts = template.split(SLOT).peekable();

        while let Some(part) = parts.next() {
            url.push_str(part);
            if parts.peek().is_some() {
                url.push_str(values.next().unwrap_or_default());
            }
        }
        url
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MySql => "mysql",
            Self::Postgresql => "postgresql",
        }
    }
}

impl FromStr for DatabaseType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mysql" => Ok(Self::MySql),
            "postgresql" | "postgres" => Ok(Self::Postgresql),
            other => Err(Error::UnsupportedDatabase(other.to_string())),
        }
    }
}

impl fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
