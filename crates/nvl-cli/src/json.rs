//! JSON form of a list.
//!
//! Entries become object members. Binary payloads are written as `{"$binary": "<hex>"}`;
//! an empty JSON array reads back as an empty number array. Descriptors have no JSON form.
//!
//! Entry names starting with `$` are written with one extra `$`, so a list
//! holding a `$binary` string never reads back as a binary payload.

use anyhow::{anyhow, bail, Context};
use nvl::{ConstNvList, NvFlags, NvList, NvValue};
use serde_json::{Map, Value as Json};

const BINARY_TAG: &str = "$binary";

fn escape_name(name: &str) -> String {
    if name.starts_with('$') {
        format!("${name}")
    } else {
        name.to_owned()
    }
}

fn unescape_name(name: &str) -> &str {
    match name.strip_prefix('$') {
        Some(rest) if rest.starts_with('$') => rest,
        _ => name,
    }
}

pub fn to_json(nvl: ConstNvList<'_>) -> anyhow::Result<Json> {
    let mut object = Map::new();
    for (name, value) in nvl.iter()? {
        let json = match value {
            NvValue::Null => Json::Null,
            NvValue::Bool(b) => Json::Bool(b),
            NvValue::Number(n) => Json::from(n),
            NvValue::String(s) => Json::from(s),
            NvValue::NvList(nested) => to_json(nested)?,
            NvValue::Binary(bytes) => binary(bytes),
            NvValue::BoolArray(items) => Json::from(items.to_vec()),
            NvValue::NumberArray(items) => Json::from(items.to_vec()),
            NvValue::StringArray(items) => Json::from(items),
            NvValue::NvListArray(items) => Json::Array(
                items.into_iter().map(to_json).collect::<anyhow::Result<_>>()?,
            ),
            NvValue::Descriptor(_) | NvValue::DescriptorArray(_) => {
                bail!("entry {name:?} holds descriptors, which have no JSON form")
            }
        };
        object.insert(escape_name(name), json);
    }
    Ok(Json::Object(object))
}

fn binary(bytes: &[u8]) -> Json {
    let mut tagged = Map::new();
    tagged.insert(BINARY_TAG.to_owned(), Json::from(hex::encode(bytes)));
    Json::Object(tagged)
}

fn as_binary(object: &Map<String, Json>) -> Option<anyhow::Result<Vec<u8>>> {
    match (object.len(), object.get(BINARY_TAG)) {
        (1, Some(Json::String(text))) => {
            Some(hex::decode(text).context("decoding binary payload"))
        }
        _ => None,
    }
}

pub fn from_json(json: &Json, flags: NvFlags) -> anyhow::Result<NvList> {
    let object = json
        .as_object()
        .ok_or_else(|| anyhow!("top-level JSON value must be an object"))?;
    let mut nvl = NvList::with_flags(flags);
    for (name, value) in object {
        add(&mut nvl, unescape_name(name), value, flags)
            .with_context(|| format!("entry {name:?}"))?;
    }
    Ok(nvl)
}

fn number(json: &Json) -> anyhow::Result<u64> {
    json.as_u64()
        .ok_or_else(|| anyhow!("{json} is not an unsigned 64-bit integer"))
}

fn add(nvl: &mut NvList, name: &str, value: &Json, flags: NvFlags) -> anyhow::Result<()> {
    match value {
        Json::Null => nvl.add_null(name)?,
        Json::Bool(b) => nvl.add_bool(name, *b)?,
        Json::Number(_) => nvl.add_number(name, number(value)?)?,
        Json::String(s) => nvl.add_string(name, s)?,
        Json::Object(object) => match as_binary(object) {
            Some(bytes) => nvl.move_binary(name, bytes?)?,
            None => nvl.move_nvlist(name, from_json(value, flags)?)?,
        },
        Json::Array(items) => add_array(nvl, name, items, flags)?,
    }
    Ok(())
}

fn add_array(nvl: &mut NvList, name: &str, items: &[Json], flags: NvFlags) -> anyhow::Result<()> {
    let Some(first) = items.first() else {
        nvl.add_number_array(name, &[])?;
        return Ok(());
    };
    match first {
        Json::Bool(_) => {
            let values = items
                .iter()
                .map(|item| item.as_bool().ok_or_else(|| anyhow!("mixed array: {item}")))
                .collect::<anyhow::Result<Vec<_>>>()?;
            nvl.move_bool_array(name, values)?;
        }
        Json::Number(_) => {
            let values = items.iter().map(number).collect::<anyhow::Result<Vec<_>>>()?;
            nvl.move_number_array(name, values)?;
        }
        Json::String(_) => {
            let values = items
                .iter()
                .map(|item| {
                    item.as_str()
                        .map(str::to_owned)
                        .ok_or_else(|| anyhow!("mixed array: {item}"))
                })
                .collect::<anyhow::Result<Vec<_>>>()?;
            nvl.move_string_array(name, values)?;
        }
        Json::Object(_) => {
            let values = items
                .iter()
                .map(|item| from_json(item, flags))
                .collect::<anyhow::Result<Vec<_>>>()?;
            nvl.move_nvlist_array(name, values)?;
        }
        Json::Null | Json::Array(_) => bail!("arrays of {first} are not representable"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nvl::NvRead;
    use serde_json::json;

    fn sample() -> Json {
        json!({
            "name": "disk0",
            "size": 512,
            "online": true,
            "spare": null,
            "label": { "$binary": "cafe" },
            "flags": [true, false],
            "sectors": [1, 2, 3],
            "aliases": ["a", "b"],
            "parts": [{ "index": 0 }, { "index": 1 }],
            "meta": { "vendor": "acme" }
        })
    }

    #[test]
    fn json_round_trip() {
        let nvl = from_json(&sample(), NvFlags::NONE).unwrap();
        assert_eq!(nvl.get_binary("label").unwrap(), &[0xca, 0xfe]);
        assert_eq!(nvl.get_number_array("sectors").unwrap(), &[1, 2, 3]);
        assert_eq!(nvl.get_nvlist_array("parts").unwrap().len(), 2);
        assert_eq!(to_json(nvl.as_const()).unwrap(), sample());
    }

    #[test]
    fn survives_packing() {
        let nvl = from_json(&sample(), NvFlags::NONE).unwrap();
        let back = NvList::unpack(&nvl.pack().unwrap(), NvFlags::NONE).unwrap();
        assert_eq!(to_json(back.as_const()).unwrap(), sample());
    }

    #[test]
    fn dollar_names_do_not_turn_into_binary() {
        let mut inner = NvList::new();
        inner.add_string("$binary", "cafe").unwrap();
        let mut nvl = NvList::new();
        nvl.move_nvlist("tricky", inner).unwrap();
        nvl.add_number("$n", 1).unwrap();

        let json = to_json(nvl.as_const()).unwrap();
        assert_eq!(json, json!({ "tricky": { "$$binary": "cafe" }, "$$n": 1 }));

        let back = from_json(&json, NvFlags::NONE).unwrap();
        let tricky = back.get_nvlist("tricky").unwrap();
        assert_eq!(tricky.get_string("$binary").unwrap(), "cafe");
        assert_eq!(back.get_number("$n").unwrap(), 1);
    }

    #[test]
    fn single_dollar_input_names_kept() {
        let nvl = from_json(&json!({ "$n": 1, "x": { "$binary": "00", "y": 2 } }), NvFlags::NONE).unwrap();
        assert_eq!(nvl.get_number("$n").unwrap(), 1);
        assert!(nvl.exists_nvlist("x").unwrap());
    }

    #[test]
    fn empty_array_becomes_number_array() {
        let nvl = from_json(&json!({ "empty": [] }), NvFlags::NONE).unwrap();
        assert!(nvl.exists_number_array("empty").unwrap());
    }

    #[test]
    fn rejects_unrepresentable_values() {
        for bad in [
            json!([1, 2]),
            json!({ "n": -1 }),
            json!({ "n": 1.5 }),
            json!({ "mixed": [1, "a"] }),
            json!({ "nested": [[1]] }),
            json!({ "nulls": [null] }),
            json!({ "bin": { "$binary": "zz" } }),
        ] {
            assert!(from_json(&bad, NvFlags::NONE).is_err(), "{bad}");
        }
    }

    #[test]
    fn case_insensitive_duplicates_rejected() {
        let err = from_json(&json!({ "Key": 1, "key": 2 }), NvFlags::IGNORE_CASE).unwrap_err();
        assert!(format!("{err:#}").contains("already exists"));
    }

    #[test]
    fn descriptors_have_no_json_form() {
        let file = tempfile::tempfile().unwrap();
        let mut nvl = NvList::new();
        nvl.add_descriptor("fd", std::os::fd::AsFd::as_fd(&file)).unwrap();
        assert!(to_json(nvl.as_const()).is_err());
    }
}
