//! Per-stream commands: add, read, del, len.

use super::CommandResult;
use rangestream_core::{Backend, Event};
use serde::Serialize;

/// One event as printed by `read`.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct EventRecord {
    /// Position in the stream.
    pub index: u64,
    /// Payload size in bytes.
    pub size: usize,
    /// Payload, lossily decoded as UTF-8.
    pub data: String,
}

/// Result of a `read`.
#[derive(Debug, Serialize)]
pub struct ReadResult {
    /// Stream name.
    pub stream: String,
    /// Stream length at the time of the read.
    pub len: u64,
    /// The events read.
    pub events: Vec<EventRecord>,
}

/// Appends each of `events` to `name`, in order.
pub fn add(backend: &dyn Backend, name: &str, events: &[String]) -> CommandResult {
    let stream = backend.get_stream(name)?;
    for event in events {
        stream.add(event.as_bytes())?;
    }
    println!("Appended {} events to {name:?} (length {})", events.len(), stream.len()?);
    stream.close()?;
    Ok(())
}

/// Reads `[from, to)` of `name`.
pub fn read(backend: &dyn Backend, name: &str, from: u64, to: i64) -> CommandResult<ReadResult> {
    let stream = backend.get_stream(name)?;
    let len = stream.len()?;
    let events = stream.read_to_vec(from, to)?;
    stream.close()?;

    let start = first_index(from, to, len);
    Ok(ReadResult {
        stream: name.to_string(),
        len,
        events: records(start, events),
    })
}

/// Runs `read` and prints the result.
pub fn run_read(
    backend: &dyn Backend,
    name: &str,
    from: u64,
    to: i64,
    format: &str,
) -> CommandResult {
    let result = read(backend, name, from, to)?;
    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&result)?),
        _ => {
            for record in &result.events {
                println!("{:>6}  {}", record.index, record.data);
            }
            println!("({} of {} events)", result.events.len(), result.len);
        }
    }
    Ok(())
}

/// Deletes `[from, to)` of `name`.
pub fn del(backend: &dyn Backend, name: &str, from: u64, to: i64) -> CommandResult<bool> {
    let stream = backend.get_stream(name)?;
    let removed = match stream.del(from, to) {
        Ok(removed) => removed,
        Err(err) if err.is_data_loss() => {
            eprintln!("WARNING: stream {name:?} lost events during delete");
            return Err(err.into());
        }
        Err(err) => return Err(err.into()),
    };
    stream.close()?;
    Ok(removed)
}

/// Returns the length of `name`.
pub fn len(backend: &dyn Backend, name: &str) -> CommandResult<u64> {
    let stream = backend.get_stream(name)?;
    let len = stream.len()?;
    stream.close()?;
    Ok(len)
}

fn first_index(from: u64, to: i64, len: u64) -> u64 {
    let (from, _) = rangestream_core::range::normalize(from as i64, to, len);
    from.max(0) as u64
}

fn records(start: u64, events: Vec<Event>) -> Vec<EventRecord> {
    events
        .into_iter()
        .zip(start..)
        .map(|(event, index)| EventRecord {
            index,
            size: event.len(),
            data: String::from_utf8_lossy(&event).into_owned(),
        })
        .collect()
}
