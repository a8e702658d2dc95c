use alloc::borrow::ToOwned;
use alloc::boxed::Box;
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::any::{Any, TypeId};
use core::time::Duration;

use xb_tree::{XName, ns};
use xb_utils::TypeIdMap;

use crate::meta::{TypeHandle, TypeTraitText, XmlType};

// -----------------------------------------------------------------------------
// ScalarEntry

/// A type with a fixed XML Schema name and text form.
#[derive(Clone)]
pub struct ScalarEntry {
    handle: TypeHandle,
    name: XName,
    codec: TypeTraitText,
}

impl ScalarEntry {
    #[inline]
    pub fn handle(&self) -> TypeHandle {
        self.handle
    }

    #[inline]
    pub fn name(&self) -> &XName {
        &self.name
    }

    #[inline]
    pub fn codec(&self) -> &TypeTraitText {
        &self.codec
    }
}

// -----------------------------------------------------------------------------
// ScalarTable

/// The primitive types, named in the XML Schema namespace.
///
/// # Examples
///
/// ```
/// use xb_serial::ScalarTable;
///
/// let table = ScalarTable::builtin();
/// let int = table.get_type::<i32>().unwrap();
///
/// assert_eq!(int.name().local_name(), "int");
/// assert_eq!(int.codec().to_text(&-4_i32).as_deref(), Some("-4"));
/// ```
#[derive(Clone, Default)]
pub struct ScalarTable {
    entries: TypeIdMap<ScalarEntry>,
    order: Vec<TypeId>,
}

impl ScalarTable {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in table.
    pub fn builtin() -> Self {
        let mut table = Self::new();
        table.insert::<String>("string", TypeTraitText::new(string_to_text, string_from_text));
        table.insert::<bool>("boolean", TypeTraitText::new(bool_to_text, bool_from_text));
        table.insert::<char>("char", TypeTraitText::new(char_to_text, char_from_text));
        table.insert::<i8>("byte", integer::<i8>());
        table.insert::<i16>("short", integer::<i16>());
        table.insert::<i32>("int", integer::<i32>());
        table.insert::<i64>("long", integer::<i64>());
        table.insert::<i128>("integer", integer::<i128>());
        table.insert::<u8>("unsignedByte", integer::<u8>());
        table.insert::<u16>("unsignedShort", integer::<u16>());
        table.insert::<u32>("unsignedInt", integer::<u32>());
        table.insert::<u64>("unsignedLong", integer::<u64>());
        table.insert::<u128>("nonNegativeInteger", integer::<u128>());
        table.insert::<f32>("float", TypeTraitText::new(f32_to_text, f32_from_text));
        table.insert::<f64>("double", TypeTraitText::new(f64_to_text, f64_from_text));
        table.insert::<Duration>(
            "duration",
            TypeTraitText::new(duration_to_text, duration_from_text),
        );
        #[cfg(feature = "chrono")]
        chrono_scalars::insert(&mut table);
        #[cfg(feature = "uuid")]
        table.insert::<uuid::Uuid>("guid", TypeTraitText::display::<uuid::Uuid>());
        table
    }

    /// Adds or replaces a scalar named `local` in the XML Schema namespace.
    pub fn insert<T: XmlType>(&mut self, local: &str, codec: TypeTraitText) {
        let id = TypeId::of::<T>();
        let entry = ScalarEntry {
            handle: TypeHandle::of::<T>(),
            name: XName::new(ns::XSD, local),
            codec,
        };
        if self.entries.insert(id, entry).is_none() {
            self.order.push(id);
        }
    }

    #[inline]
    pub fn get(&self, type_id: &TypeId) -> Option<&ScalarEntry> {
        self.entries.get(type_id)
    }

    #[inline]
    pub fn get_type<T: Any>(&self) -> Option<&ScalarEntry> {
        self.entries.get_type::<T>()
    }

    #[inline]
    pub fn contains(&self, type_id: &TypeId) -> bool {
        self.entries.contains(type_id)
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &ScalarEntry> {
        self.order.iter().filter_map(|id| self.entries.get(id))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

// -----------------------------------------------------------------------------
// Codecs

fn boxed<T: Any>(value: T) -> Box<dyn Any> {
    Box::new(value)
}

fn string_to_text(value: &dyn Any) -> Option<String> {
    value.downcast_ref::<String>().cloned()
}

fn string_from_text(text: &str) -> Result<Box<dyn Any>, String> {
    Ok(boxed(text.to_owned()))
}

fn bool_to_text(value: &dyn Any) -> Option<String> {
    value
        .downcast_ref::<bool>()
        .map(|v| if *v { "true" } else { "false" }.to_owned())
}

fn bool_from_text(text: &str) -> Result<Box<dyn Any>, String> {
    match text.trim() {
        "true" | "1" => Ok(boxed(true)),
        "false" | "0" => Ok(boxed(false)),
        _ => Err("expected `true`, `false`, `1` or `0`".to_owned()),
    }
}

fn char_to_text(value: &dyn Any) -> Option<String> {
    value.downcast_ref::<char>().map(char::to_string)
}

fn char_from_text(text: &str) -> Result<Box<dyn Any>, String> {
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(boxed(c)),
        _ => Err("expected exactly one character".to_owned()),
    }
}

fn integer<T>() -> TypeTraitText
where
    T: Any + core::fmt::Display + core::str::FromStr,
    T::Err: core::fmt::Display,
{
    TypeTraitText::new(
        |value| value.downcast_ref::<T>().map(ToString::to_string),
        |text| {
            text.trim()
                .parse::<T>()
                .map(boxed)
                .map_err(|e| e.to_string())
        },
    )
}

macro_rules! float_codec {
    ($to:ident, $from:ident, $ty:ty) => {
        fn $to(value: &dyn Any) -> Option<String> {
            let v = *value.downcast_ref::<$ty>()?;
            Some(if v.is_nan() {
                "NaN".to_owned()
            } else if v == <$ty>::INFINITY {
                "INF".to_owned()
            } else if v == <$ty>::NEG_INFINITY {
                "-INF".to_owned()
            } else {
                v.to_string()
            })
        }

        fn $from(text: &str) -> Result<Box<dyn Any>, String> {
            match text.trim() {
                "INF" | "+INF" => Ok(boxed(<$ty>::INFINITY)),
                "-INF" => Ok(boxed(<$ty>::NEG_INFINITY)),
                "NaN" => Ok(boxed(<$ty>::NAN)),
                other => other.parse::<$ty>().map(boxed).map_err(|e| e.to_string()),
            }
        }
    };
}

float_codec!(f32_to_text, f32_from_text, f32);
float_codec!(f64_to_text, f64_from_text, f64);

fn duration_to_text(value: &dyn Any) -> Option<String> {
    let d = value.downcast_ref::<Duration>()?;
    let nanos = d.subsec_nanos();
    Some(if nanos == 0 {
        format!("PT{}S", d.as_secs())
    } else {
        let fraction = format!("{nanos:09}");
        format!("PT{}.{}S", d.as_secs(), fraction.trim_end_matches('0'))
    })
}

/// Reads `PnDTnHnMn.nS` durations. Years, months and signs are rejected.
fn duration_from_text(text: &str) -> Result<Box<dyn Any>, String> {
    fn number(digits: &str) -> Result<u64, String> {
        digits.parse::<u64>().map_err(|e| format!("`{digits}`: {e}"))
    }

    fn add(secs: u64, digits: &str, unit: u64) -> Result<u64, String> {
        number(digits)?
            .checked_mul(unit)
            .and_then(|part| secs.checked_add(part))
            .ok_or_else(|| format!("`{digits}` overflows a duration"))
    }

    let rest = text
        .trim()
        .strip_prefix('P')
        .ok_or_else(|| "a duration starts with `P`".to_owned())?;
    let (date, time) = match rest.split_once('T') {
        Some((date, time)) => (date, Some(time)),
        None => (rest, None),
    };
    if date.is_empty() && time.is_none_or(str::is_empty) {
        return Err("empty duration".to_owned());
    }

    let mut secs = 0_u64;
    let mut nanos = 0_u32;
    if !date.is_empty() {
        let days = date
            .strip_suffix('D')
            .ok_or_else(|| "only days are supported before `T`".to_owned())?;
        secs = add(secs, days, 86_400)?;
    }
    if let Some(mut time) = time {
        if let Some((hours, rest)) = time.split_once('H') {
            secs = add(secs, hours, 3_600)?;
            time = rest;
        }
        if let Some((minutes, rest)) = time.split_once('M') {
            secs = add(secs, minutes, 60)?;
            time = rest;
        }
        if let Some(seconds) = time.strip_suffix('S') {
            let (whole, fraction) = seconds.split_once('.').unwrap_or((seconds, ""));
            secs = add(secs, whole, 1)?;
            if !fraction.is_empty() {
                if fraction.len() > 9 || !fraction.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(format!("invalid fraction `{fraction}`"));
                }
                nanos = number(&format!("{fraction:0<9}"))? as u32;
            }
        } else if !time.is_empty() {
            return Err(format!("unexpected `{time}`"));
        }
    }
    Ok(boxed(Duration::new(secs, nanos)))
}

#[cfg(feature = "chrono")]
mod chrono_scalars {
    use alloc::boxed::Box;
    use alloc::string::{String, ToString};
    use core::any::Any;

    use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, Utc};

    use super::{ScalarTable, boxed};
    use crate::meta::TypeTraitText;

    fn date_time_to_text(value: &dyn Any) -> Option<String> {
        value
            .downcast_ref::<DateTime<Utc>>()
            .map(|v| v.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }

    fn date_time_from_text(text: &str) -> Result<Box<dyn Any>, String> {
        DateTime::parse_from_rfc3339(text.trim())
            .map(|v| boxed(v.with_timezone(&Utc)))
            .map_err(|e| e.to_string())
    }

    pub(super) fn insert(table: &mut ScalarTable) {
        table.insert::<DateTime<Utc>>(
            "dateTime",
            TypeTraitText::new(date_time_to_text, date_time_from_text),
        );
        table.insert::<NaiveDate>("date", TypeTraitText::display::<NaiveDate>());
        table.insert::<NaiveTime>("time", TypeTraitText::display::<NaiveTime>());
    }
}

#[cfg(test)]
mod tests {
    use super::ScalarTable;
    use core::time::Duration;

    fn text_of<T: 'static>(table: &ScalarTable, value: T) -> String {
        table.get_type::<T>().unwrap().codec().to_text(&value).unwrap()
    }

    fn read<T: 'static + Copy>(table: &ScalarTable, text: &str) -> Result<T, String> {
        let entry = table.get_type::<T>().unwrap();
        entry
            .codec()
            .from_text(text)
            .map(|v| *v.downcast::<T>().unwrap())
    }

    #[test]
    fn names_are_unique() {
        let table = ScalarTable::builtin();
        let mut names: Vec<_> = table.iter().map(|e| e.name().clone()).collect();
        let count = names.len();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), count);
        assert!(names.iter().all(|n| n.namespace() == xb_tree::ns::XSD));
    }

    #[test]
    fn booleans_and_numbers() {
        let table = ScalarTable::builtin();
        assert_eq!(text_of(&table, true), "true");
        assert_eq!(read::<bool>(&table, " 1 "), Ok(true));
        assert!(read::<bool>(&table, "yes").is_err());
        assert_eq!(read::<i32>(&table, " -12 "), Ok(-12));
        assert!(read::<u8>(&table, "256").is_err());
        assert_eq!(read::<char>(&table, "x"), Ok('x'));
        assert!(read::<char>(&table, "xy").is_err());
    }

    #[test]
    fn special_floats() {
        let table = ScalarTable::builtin();
        assert_eq!(text_of(&table, f64::INFINITY), "INF");
        assert_eq!(text_of(&table, f32::NEG_INFINITY), "-INF");
        assert_eq!(text_of(&table, 0.1_f64), "0.1");
        assert!(read::<f64>(&table, "NaN").unwrap().is_nan());
        assert_eq!(read::<f64>(&table, "1e3"), Ok(1000.0));
    }

    #[test]
    fn durations() {
        let table = ScalarTable::builtin();
        assert_eq!(text_of(&table, Duration::from_millis(1500)), "PT1.5S");
        assert_eq!(text_of(&table, Duration::from_secs(60)), "PT60S");
        assert_eq!(
            read::<Duration>(&table, "P1DT2H3M4.25S"),
            Ok(Duration::new(86_400 + 7_200 + 180 + 4, 250_000_000))
        );
        assert_eq!(read::<Duration>(&table, "PT0.000000001S"), Ok(Duration::new(0, 1)));
        assert!(read::<Duration>(&table, "P1Y").is_err());
        assert!(read::<Duration>(&table, "PT").is_err());
        assert!(read::<Duration>(&table, "PT1.5").is_err());
    }

    #[test]
    fn oversized_durations_are_rejected() {
        let table = ScalarTable::builtin();
        let err = read::<Duration>(&table, "P999999999999999999D").unwrap_err();
        assert!(err.contains("overflows"));
        assert!(read::<Duration>(&table, "PT9999999999999999H").is_err());
        assert!(read::<Duration>(&table, "P1DT18446744073709551615S").is_err());
        assert_eq!(
            read::<Duration>(&table, "PT18446744073709551615S"),
            Ok(Duration::from_secs(u64::MAX))
        );
    }
}
