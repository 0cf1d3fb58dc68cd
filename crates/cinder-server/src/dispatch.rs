//! Command execution against the keyspace.
//!
//! The protocol crate has already validated arity and numeric
//! arguments; this module runs the command and builds the reply. Type
//! mismatches against live entries surface here as `-3` errors.

use bytes::{Bytes, BytesMut};
use cinder_core::{Keyspace, TtlStatus, WrongType};
use cinder_protocol::{Command, Reply, ERR_TYPE};

/// Parses and executes one command vector, serializing the reply into
/// `out`.
pub fn dispatch(args: &[Bytes], keyspace: &mut Keyspace, out: &mut BytesMut) {
    let reply = match Command::parse(args) {
        Ok(cmd) => execute(cmd, keyspace),
        Err(e) => Reply::error(e.code, e.message),
    };
    reply.serialize(out);
}

fn execute(cmd: Command, keyspace: &mut Keyspace) -> Reply {
    match cmd {
        Command::Get { key } => match keyspace.get_string(&key) {
            Ok(Some(value)) => Reply::String(value.clone()),
            Ok(None) => Reply::Nil,
            Err(e) => wrong_type(e),
        },

        Command::Set { key, value } => {
            keyspace.set_string(key, value);
            Reply::String(Bytes::from_static(b"OK"))
        }

        Command::Del { key } => Reply::Integer(i64::from(keyspace.delete(&key))),

        Command::Exists { key } => Reply::Integer(i64::from(keyspace.exists(&key))),

        Command::FlushAll => {
            keyspace.clear_all();
            Reply::Integer(1)
        }

        Command::ZAdd { key, score, member } => match keyspace.zadd(&key, member, score) {
            Ok(added) => Reply::Integer(i64::from(added)),
            Err(e) => wrong_type(e),
        },

        Command::ZRem { key, member } => match keyspace.zrem(&key, &member) {
            Ok(removed) => Reply::Integer(i64::from(removed)),
            Err(e) => wrong_type(e),
        },

        Command::PExpire { key, ttl_ms } => {
            Reply::Integer(i64::from(keyspace.pexpire(&key, ttl_ms)))
        }

        Command::PTtl { key } => match keyspace.ttl(&key) {
            TtlStatus::Remaining(ms) => Reply::Integer(ms),
            TtlStatus::NoExpiry => Reply::Integer(-1),
            TtlStatus::Missing => Reply::Integer(-2),
        },
    }
}

fn wrong_type(e: WrongType) -> Reply {
    Reply::error(ERR_TYPE, e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cinder_protocol::{ERR_ARG, ERR_UNKNOWN};

    fn run(keyspace: &mut Keyspace, parts: &[&[u8]]) -> Reply {
        let args: Vec<Bytes> = parts.iter().map(|p| Bytes::copy_from_slice(p)).collect();
        let mut out = BytesMut::new();
        dispatch(&args, keyspace, &mut out);
        let (reply, consumed) = Reply::parse(&out).unwrap().unwrap();
        assert_eq!(consumed, out.len(), "dispatch must emit exactly one reply");
        reply
    }

    #[test]
    fn set_get_del_sequence() {
        let mut ks = Keyspace::new();
        assert_eq!(
            run(&mut ks, &[b"SET", b"foo", b"bar"]),
            Reply::String(Bytes::from_static(b"OK"))
        );
        assert_eq!(
            run(&mut ks, &[b"GET", b"foo"]),
            Reply::String(Bytes::from_static(b"bar"))
        );
        assert_eq!(run(&mut ks, &[b"DEL", b"foo"]), Reply::Integer(1));
        assert_eq!(run(&mut ks, &[b"GET", b"foo"]), Reply::Nil);
    }

    #[test]
    fn del_is_idempotent() {
        let mut ks = Keyspace::new();
        run(&mut ks, &[b"SET", b"k", b"v"]);
        assert_eq!(run(&mut ks, &[b"DEL", b"k"]), Reply::Integer(1));
        assert_eq!(run(&mut ks, &[b"DEL", b"k"]), Reply::Integer(0));
    }

    #[test]
    fn exists_probe() {
        let mut ks = Keyspace::new();
        assert_eq!(run(&mut ks, &[b"EXISTS", b"k"]), Reply::Integer(0));
        run(&mut ks, &[b"SET", b"k", b"v"]);
        assert_eq!(run(&mut ks, &[b"EXISTS", b"k"]), Reply::Integer(1));
    }

    #[test]
    fn flushall_twice_succeeds_both_times() {
        let mut ks = Keyspace::new();
        run(&mut ks, &[b"SET", b"k", b"v"]);
        assert_eq!(run(&mut ks, &[b"FLUSHALL"]), Reply::Integer(1));
        assert_eq!(run(&mut ks, &[b"FLUSHALL"]), Reply::Integer(1));
        assert_eq!(run(&mut ks, &[b"GET", b"k"]), Reply::Nil);
    }

    #[test]
    fn zadd_add_then_update() {
        let mut ks = Keyspace::new();
        assert_eq!(
            run(&mut ks, &[b"ZADD", b"lb", b"10", b"alice"]),
            Reply::Integer(1)
        );
        assert_eq!(
            run(&mut ks, &[b"ZADD", b"lb", b"20", b"alice"]),
            Reply::Integer(0)
        );
        assert_eq!(run(&mut ks, &[b"ZREM", b"lb", b"alice"]), Reply::Integer(1));
        assert_eq!(run(&mut ks, &[b"ZREM", b"lb", b"alice"]), Reply::Integer(0));
    }

    #[test]
    fn zrem_on_missing_key_is_zero() {
        let mut ks = Keyspace::new();
        assert_eq!(run(&mut ks, &[b"ZREM", b"nope", b"m"]), Reply::Integer(0));
    }

    #[test]
    fn arity_error_carries_message() {
        let mut ks = Keyspace::new();
        assert_eq!(
            run(&mut ks, &[b"GET"]),
            Reply::error(ERR_ARG, "GET requires one key")
        );
    }

    #[test]
    fn unknown_command_error() {
        let mut ks = Keyspace::new();
        assert_eq!(
            run(&mut ks, &[b"NOPE", b"foo"]),
            Reply::error(ERR_UNKNOWN, "unknown command")
        );
    }

    #[test]
    fn type_errors_for_mismatched_keys() {
        let mut ks = Keyspace::new();
        run(&mut ks, &[b"SET", b"k", b"v"]);
        assert_eq!(
            run(&mut ks, &[b"ZADD", b"k", b"1", b"m"]),
            Reply::error(ERR_TYPE, "Key holds wrong type")
        );
        assert_eq!(
            run(&mut ks, &[b"ZREM", b"k", b"m"]),
            Reply::error(ERR_TYPE, "Key holds wrong type")
        );

        run(&mut ks, &[b"ZADD", b"z", b"1", b"m"]);
        assert_eq!(
            run(&mut ks, &[b"GET", b"z"]),
            Reply::error(ERR_TYPE, "Key holds wrong type")
        );
    }

    #[test]
    fn pexpire_and_pttl() {
        let mut ks = Keyspace::new();
        assert_eq!(run(&mut ks, &[b"PEXPIRE", b"k", b"100"]), Reply::Integer(0));
        assert_eq!(run(&mut ks, &[b"PTTL", b"k"]), Reply::Integer(-2));

        run(&mut ks, &[b"SET", b"k", b"v"]);
        assert_eq!(run(&mut ks, &[b"PTTL", b"k"]), Reply::Integer(-1));

        assert_eq!(
            run(&mut ks, &[b"PEXPIRE", b"k", b"60000"]),
            Reply::Integer(1)
        );
        match run(&mut ks, &[b"PTTL", b"k"]) {
            Reply::Integer(ms) => assert!(ms > 0 && ms <= 60_000),
            other => panic!("expected integer, got {other:?}"),
        }
    }

    #[test]
    fn pexpire_zero_deletes_and_reports_applied() {
        let mut ks = Keyspace::new();
        run(&mut ks, &[b"SET", b"k", b"v"]);
        assert_eq!(run(&mut ks, &[b"PEXPIRE", b"k", b"0"]), Reply::Integer(1));
        assert_eq!(run(&mut ks, &[b"EXISTS", b"k"]), Reply::Integer(0));
    }
}
