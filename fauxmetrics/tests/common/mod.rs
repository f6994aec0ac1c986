#![allow(dead_code)]

use std::{
    io::{self, Write},
    sync::{Arc, Mutex},
};

/// A parsed wire line.
#[derive(Debug)]
pub struct Line {
    pub name: String,
    pub value: f64,
    pub kind: char,
    pub tags: Vec<String>,
}

/// Strictly parse `<name>:<value>|<c|g>[|#<tag>,<tag>...]`, returning `None`
/// for anything else.
pub fn parse_line(line: &str) -> Option<Line> {
    let mut parts = line.split('|');
    let (name, value) = parts.next()?.split_once(':')?;
    if name.is_empty() || value.contains(':') {
        return None;
    }
    let value: f64 = value.parse().ok()?;

    let kind = match parts.next()? {
        "c" => 'c',
        "g" => 'g',
        _ => return None,
    };

    let tags = match parts.next() {
        None => Vec::new(),
        Some(segment) => {
            let tags: Vec<String> = segment
                .strip_prefix('#')?
                .split(',')
                .map(String::from)
                .collect();
            if tags.iter().any(|t| t.split_once(':').is_none()) {
                return None;
            }
            tags
        }
    };
    if parts.next().is_some() {
        return None;
    }

    Some(Line {
        name: name.to_string(),
        value,
        kind,
        tags,
    })
}

/// An in-memory console shared between the emitter and the test.
#[derive(Clone, Default)]
pub struct Console(Arc<Mutex<Vec<u8>>>);

impl Write for Console {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Console {
    pub fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}
