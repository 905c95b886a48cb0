use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

use anyhow::Context;
use colored::Colorize;
use nvl::{ConstNvList, NvFlags, NvList, NvRead, NvValue, UnpackLimits};
use tracing::debug;

use crate::cli::*;
use crate::config::CliConfig;
use crate::json;

/// Flags and limits after merging the config file with the switches.
struct Settings {
    flags: NvFlags,
    limits: UnpackLimits,
}

impl Settings {
    fn resolve(cli: &Cli) -> anyhow::Result<Self> {
        let mut config = match &cli.config {
            Some(path) => CliConfig::load(path)?,
            None => CliConfig::default(),
        };
        config.ignore_case |= cli.ignore_case;
        config.no_unique |= cli.no_unique;
        debug!(?config, "settings");
        Ok(Self {
            flags: config.flags(),
            limits: config.limits,
        })
    }
}

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let settings = Settings::resolve(&cli)?;
    let mut out = io::stdout().lock();
    match cli.command {
        Command::Dump(args) => cmd_dump(&settings, &args, &mut out),
        Command::Keys(args) => cmd_keys(&settings, &args, &mut out),
        Command::Get(args) => cmd_get(&settings, &args, &mut out),
        Command::Json(args) => cmd_json(&settings, &args, &mut out),
        Command::Pack(args) => cmd_pack(&settings, &args, &mut out),
    }
}

fn read_input(path: &Path) -> anyhow::Result<Vec<u8>> {
    if path == Path::new("-") {
        let mut bytes = Vec::new();
        io::stdin().read_to_end(&mut bytes).context("reading stdin")?;
        return Ok(bytes);
    }
    fs::read(path).with_context(|| format!("reading {}", path.display()))
}

fn load(settings: &Settings, path: &Path) -> anyhow::Result<NvList> {
    let bytes = read_input(path)?;
    NvList::unpack_with(&bytes, settings.flags, &settings.limits)
        .with_context(|| format!("unpacking {}", path.display()))
}

fn cmd_dump(settings: &Settings, args: &InputArgs, out: &mut dyn Write) -> anyhow::Result<()> {
    let nvl = load(settings, &args.input)?;
    nvl.as_const().dump(out)?;
    Ok(())
}

fn cmd_keys(settings: &Settings, args: &InputArgs, out: &mut dyn Write) -> anyhow::Result<()> {
    let nvl = load(settings, &args.input)?;
    for (name, value) in nvl.iter()? {
        writeln!(out, "{} {}", name.bold(), format!("({})", value.nv_type().name()).dimmed())?;
    }
    Ok(())
}

fn cmd_get(settings: &Settings, args: &GetArgs, out: &mut dyn Write) -> anyhow::Result<()> {
    let nvl = load(settings, &args.input)?;
    let value = lookup(nvl.as_const(), &args.key)?;
    write_value(out, value)
}

/// First entry named `key`, honouring the list's case folding.
fn lookup<'a>(nvl: ConstNvList<'a>, key: &str) -> anyhow::Result<NvValue<'a>> {
    let ignore_case = nvl.flags()?.ignore_case();
    nvl.iter()?
        .find(|(name, _)| {
            if ignore_case {
                name.eq_ignore_ascii_case(key)
            } else {
                *name == key
            }
        })
        .map(|(_, value)| value)
        .ok_or_else(|| nvl::NvError::KeyNotFound { key: key.to_owned() }.into())
}

fn write_value(out: &mut dyn Write, value: NvValue<'_>) -> anyhow::Result<()> {
    match value {
        NvValue::Null => writeln!(out, "{}", "null".dimmed())?,
        NvValue::Bool(b) => writeln!(out, "{b}")?,
        NvValue::Number(n) => writeln!(out, "{n}")?,
        NvValue::String(s) => writeln!(out, "{s}")?,
        NvValue::Binary(bytes) => writeln!(out, "{}", hex::encode(bytes))?,
        NvValue::NvList(nested) => nested.dump(out)?,
        NvValue::BoolArray(items) => writeln!(out, "{items:?}")?,
        NvValue::NumberArray(items) => writeln!(out, "{items:?}")?,
        NvValue::StringArray(items) => writeln!(out, "{items:?}")?,
        NvValue::NvListArray(items) => {
            for (i, nested) in items.into_iter().enumerate() {
                writeln!(out, "{}", format!("[{i}]").yellow())?;
                nested.dump(out)?;
            }
        }
        NvValue::Descriptor(fd) => writeln!(out, "fd {fd:?}")?,
        NvValue::DescriptorArray(fds) => writeln!(out, "fds {fds:?}")?,
    }
    Ok(())
}

fn cmd_json(settings: &Settings, args: &JsonArgs, out: &mut dyn Write) -> anyhow::Result<()> {
    let nvl = load(settings, &args.input)?;
    let value = json::to_json(nvl.as_const())?;
    if args.pretty {
        serde_json::to_writer_pretty(&mut *out, &value)?;
    } else {
        serde_json::to_writer(&mut *out, &value)?;
    }
    writeln!(out)?;
    Ok(())
}

fn cmd_pack(settings: &Settings, args: &PackArgs, out: &mut dyn Write) -> anyhow::Result<()> {
    let text = read_input(&args.input)?;
    let value: serde_json::Value = serde_json::from_slice(&text)
        .with_context(|| format!("parsing {}", args.input.display()))?;
    let nvl = json::from_json(&value, settings.flags)?;
    let bytes = nvl.pack()?;
    match &args.output {
        Some(path) => {
            fs::write(path, &bytes).with_context(|| format!("writing {}", path.display()))?;
            eprintln!("{} {} entries, {} bytes", "packed".green(), nvl.iter()?.count(), bytes.len());
        }
        None => out.write_all(&bytes)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn settings() -> Settings {
        Settings {
            flags: NvFlags::NONE,
            limits: UnpackLimits::default(),
        }
    }

    fn packed_file(dir: &tempfile::TempDir) -> PathBuf {
        let mut nvl = NvList::new();
        nvl.add_number("n", 42).unwrap();
        nvl.add_string("Name", "disk").unwrap();
        let mut child = NvList::new();
        child.add_bool("ok", true).unwrap();
        nvl.move_nvlist("child", child).unwrap();
        let path = dir.path().join("list.nvl");
        fs::write(&path, nvl.pack().unwrap()).unwrap();
        path
    }

    fn run<F>(f: F) -> String
    where
        F: FnOnce(&mut dyn Write) -> anyhow::Result<()>,
    {
        colored::control::set_override(false);
        let mut out = Vec::new();
        f(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn keys_lists_names_and_types() {
        let dir = tempfile::tempdir().unwrap();
        let args = InputArgs { input: packed_file(&dir) };
        let text = run(|out| cmd_keys(&settings(), &args, out));
        assert_eq!(text, "n (NUMBER)\nName (STRING)\nchild (NVLIST)\n");
    }

    #[test]
    fn dump_includes_nested_entries() {
        let dir = tempfile::tempdir().unwrap();
        let args = InputArgs { input: packed_file(&dir) };
        let text = run(|out| cmd_dump(&settings(), &args, out));
        assert!(text.contains("n (NUMBER): 42"));
        assert!(text.contains("    ok (BOOL): TRUE"));
    }

    #[test]
    fn get_scalar_and_missing_key() {
        let dir = tempfile::tempdir().unwrap();
        let input = packed_file(&dir);
        let args = GetArgs { input: input.clone(), key: "n".into() };
        assert_eq!(run(|out| cmd_get(&settings(), &args, out)), "42\n");

        let args = GetArgs { input, key: "name".into() };
        let mut sink = Vec::new();
        assert!(cmd_get(&settings(), &args, &mut sink).is_err());
    }

    #[test]
    fn get_with_ignore_case_flag() {
        let dir = tempfile::tempdir().unwrap();
        let mut nvl = NvList::with_flags(NvFlags::IGNORE_CASE);
        nvl.add_number("Size", 42).unwrap();
        let input = dir.path().join("folded.nvl");
        fs::write(&input, nvl.pack().unwrap()).unwrap();

        let folded = Settings {
            flags: NvFlags::IGNORE_CASE,
            limits: UnpackLimits::default(),
        };
        let args = GetArgs { input, key: "SIZE".into() };
        assert_eq!(run(|out| cmd_get(&folded, &args, out)), "42\n");
    }

    #[test]
    fn flags_mismatch_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let args = InputArgs { input: packed_file(&dir) };
        let folded = Settings {
            flags: NvFlags::IGNORE_CASE,
            limits: UnpackLimits::default(),
        };
        let mut sink = Vec::new();
        let err = cmd_keys(&folded, &args, &mut sink).unwrap_err();
        assert!(format!("{err:#}").contains("unpacking"));
    }

    #[test]
    fn json_then_pack_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let input = packed_file(&dir);
        let json_path = dir.path().join("list.json");
        let text = run(|out| cmd_json(&settings(), &JsonArgs { input: input.clone(), pretty: false }, out));
        fs::write(&json_path, &text).unwrap();

        let output = dir.path().join("again.nvl");
        let args = PackArgs { input: json_path, output: Some(output.clone()) };
        let mut sink = Vec::new();
        cmd_pack(&settings(), &args, &mut sink).unwrap();

        let again = NvList::unpack(&fs::read(output).unwrap(), NvFlags::NONE).unwrap();
        assert_eq!(again.get_number("n").unwrap(), 42);
        assert!(again.get_nvlist("child").unwrap().get_bool("ok").unwrap());
    }

    #[test]
    fn pack_to_stdout_writes_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let json_path = dir.path().join("in.json");
        fs::write(&json_path, r#"{"n": 7}"#).unwrap();
        let args = PackArgs { input: json_path, output: None };
        let mut bytes = Vec::new();
        cmd_pack(&settings(), &args, &mut bytes).unwrap();
        let nvl = NvList::unpack(&bytes, NvFlags::NONE).unwrap();
        assert_eq!(nvl.get_number("n").unwrap(), 7);
    }

    #[test]
    fn limits_apply_to_input() {
        let dir = tempfile::tempdir().unwrap();
        let args = InputArgs { input: packed_file(&dir) };
        let shallow = Settings {
            flags: NvFlags::NONE,
            limits: UnpackLimits { max_depth: 0, ..UnpackLimits::default() },
        };
        let mut sink = Vec::new();
        assert!(cmd_dump(&shallow, &args, &mut sink).is_err());
    }
}
