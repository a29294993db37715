//! `mongodb+dbapi://` connect URL parsing (§6), for SQLAlchemy-style
//! toolkit integration: a single URL in, a `(uri, database)` pair the
//! façade's `connect` can use directly.

use crate::error::MdbError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectTarget {
    pub uri: String,
    pub database: String,
}

/// Parses `mongodb+dbapi://[user:pass@]host[:port]/database[?options]` into
/// the plain `mongodb://` URI the driver expects plus the database name.
/// Query parameters, if present, are forwarded verbatim onto the rewritten
/// URI.
pub fn parse_connect_url(url: &str) -> Result<ConnectTarget, MdbError> {
    const SCHEME: &str = "mongodb+dbapi://";
    let rest = url.strip_prefix(SCHEME).ok_or_else(|| {
        MdbError::unsupported_statement(format!("connect URL must start with {SCHEME}"))
    })?;

    let (authority_and_path, query) = match rest.split_once('?') {
        Some((head, q)) => (head, Some(q)),
        None => (rest, None),
    };
    let (authority, path) = authority_and_path.split_once('/').ok_or_else(|| {
        MdbError::unsupported_statement("connect URL must include a database path segment")
    })?;
    if path.is_empty() {
        return Err(MdbError::unsupported_statement(
            "connect URL database name must not be empty",
        ));
    }

    let mut uri = format!("mongodb://{authority}");
    if let Some(q) = query {
        uri.push('?');
        uri.push_str(q);
    }

    Ok(ConnectTarget {
        uri,
        database: path.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_host_and_database() {
        let target = parse_connect_url("mongodb+dbapi://localhost:27017/orders_db").unwrap();
        assert_eq!(target.uri, "mongodb://localhost:27017");
        assert_eq!(target.database, "orders_db");
    }

    #[test]
    fn forwards_query_options() {
        let target =
            parse_connect_url("mongodb+dbapi://user:pw@host1,host2/app?replicaSet=rs0").unwrap();
        assert_eq!(target.uri, "mongodb://user:pw@host1,host2?replicaSet=rs0");
        assert_eq!(target.database, "app");
    }

    #[test]
    fn rejects_wrong_scheme() {
        assert!(parse_connect_url("mongodb://localhost/db").is_err());
    }

    #[test]
    fn rejects_missing_database() {
        assert!(parse_connect_url("mongodb+dbapi://localhost:27017/").is_err());
    }
}
