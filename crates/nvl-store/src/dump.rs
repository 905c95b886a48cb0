use std::io::{self, Write};
use std::os::fd::{AsRawFd, OwnedFd};

use crate::store::Store;
use crate::value::Value;

const INDENT: usize = 4;

fn number(n: u64) -> String {
    format!("{n} ({}) ({n:#x})", n as i64)
}

fn bool_label(b: bool) -> &'static str {
    if b {
        "TRUE"
    } else {
        "FALSE"
    }
}

fn bracketed<I: IntoIterator<Item = String>>(items: I) -> String {
    let items: Vec<String> = items.into_iter().collect();
    format!("[ {} ]", items.join(", "))
}

fn fd_number(fd: &OwnedFd) -> String {
    fd.as_raw_fd().to_string()
}

impl Store {
    /// Write a human-readable listing of the store, one line per entry:
    ///
    /// ```text
    /// name (TYPE): value
    /// ```
    ///
    /// Nested lists follow their entry line, indented four spaces deeper.
    pub fn dump<W: Write + ?Sized>(&self, out: &mut W) -> io::Result<()> {
        self.dump_level(out, 0)
    }

    fn dump_level<W: Write + ?Sized>(&self, out: &mut W, level: usize) -> io::Result<()> {
        let pad = level * INDENT;
        if let Some(errno) = self.error() {
            return writeln!(out, "{:pad$}error: {}", "", errno.raw());
        }
        for (name, value) in self.iter() {
            write!(out, "{:pad$}{name} ({}):", "", value.nv_type())?;
            match value {
                Value::Null => writeln!(out)?,
                Value::Bool(b) => writeln!(out, " {}", bool_label(*b))?,
                Value::Number(n) => writeln!(out, " {}", number(*n))?,
                Value::String(s) => writeln!(out, " [{s}]")?,
                Value::Descriptor(fd) => writeln!(out, " {}", fd_number(fd))?,
                Value::Binary(b) => writeln!(out, " {}", hex::encode(b))?,
                Value::BoolArray(v) => writeln!(
                    out,
                    " {}",
                    bracketed(v.iter().map(|b| bool_label(*b).to_owned()))
                )?,
                Value::NumberArray(v) => {
                    writeln!(out, " {}", bracketed(v.iter().map(|n| number(*n))))?
                }
                Value::StringArray(v) => writeln!(
                    out,
                    " {}",
                    bracketed(v.iter().map(|s| format!("\"{s}\"")))
                )?,
                Value::DescriptorArray(v) => {
                    writeln!(out, " {}", bracketed(v.iter().map(fd_number)))?
                }
                Value::NvList(nested) => {
                    writeln!(out)?;
                    nested.dump_level(out, level + 1)?;
                }
                Value::NvListArray(v) => {
                    writeln!(out, " [{}]", v.len())?;
                    for nested in v {
                        nested.dump_level(out, level + 1)?;
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Errno;

    fn dumped(store: &Store) -> String {
        let mut out = Vec::new();
        store.dump(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn scalar_lines() {
        let mut store = Store::default();
        store.add("nothing", Value::Null);
        store.add("yes", Value::Bool(true));
        store.add("n", Value::Number(255));
        store.add("s", Value::String("hi".into()));
        store.add("raw", Value::Binary(vec![0x00, 0xab]));
        assert_eq!(
            dumped(&store),
            "nothing (NULL):\n\
             yes (BOOL): TRUE\n\
             n (NUMBER): 255 (255) (0xff)\n\
             s (STRING): [hi]\n\
             raw (BINARY): 00ab\n"
        );
    }

    #[test]
    fn negative_view_of_large_numbers() {
        let mut store = Store::default();
        store.add("max", Value::Number(u64::MAX));
        assert_eq!(
            dumped(&store),
            "max (NUMBER): 18446744073709551615 (-1) (0xffffffffffffffff)\n"
        );
    }

    #[test]
    fn arrays_are_bracketed() {
        let mut store = Store::default();
        store.add("b", Value::BoolArray(vec![true, false]));
        store.add("s", Value::StringArray(vec!["a".into(), "b".into()]));
        assert_eq!(
            dumped(&store),
            "b (BOOL ARRAY): [ TRUE, FALSE ]\n\
             s (STRING ARRAY): [ \"a\", \"b\" ]\n"
        );
    }

    #[test]
    fn nested_lists_indent() {
        let mut inner = Store::default();
        inner.add("deep", Value::Number(1));
        let mut store = Store::default();
        store.add("child", Value::NvList(Box::new(inner)));
        store.add("after", Value::Null);
        assert_eq!(
            dumped(&store),
            "child (NVLIST):\n    deep (NUMBER): 1 (1) (0x1)\nafter (NULL):\n"
        );
    }

    #[test]
    fn errored_store_reports_error() {
        let mut store = Store::default();
        store.set_error(Errno::EINVAL);
        assert_eq!(dumped(&store), format!("error: {}\n", libc::EINVAL));
    }
}
