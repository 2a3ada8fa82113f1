/* Licensed to the Apache Software Foundation (ASF) under one
 * or more contributor license agreements.  See the NOTICE file
 * distributed with this work for additional information
 * regarding copyright ownership.  The ASF licenses this file
 * to you under the Apache License, Version 2.0 (the
 * "License"); you may not use this file except in compliance
 * with the License.  You may obtain a copy of the License at
 *
 *   http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing,
 * software distributed under the License is distributed on an
 * "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
 * KIND, either express or implied.  See the License for the
 * specific language governing permissions and limitations
 * under the License.
 */

use crate::error::IndexerError;
use chrono::{
    DateTime, Days, FixedOffset, NaiveDate, NaiveTime, Offset, SecondsFormat, TimeZone, Utc,
    Weekday,
};
use serde::Deserialize;

/// A decoded "hotel created" notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HotelCreatedRecord {
    pub name: String,
    pub city_name: String,
    pub price: i64,
    pub rating: i64,
    pub user_id: String,
    pub id: String,
    pub creation_date_time: DateTime<Utc>,
    pub file_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct HotelCreatedPayload {
    name: String,
    city_name: String,
    price: i64,
    rating: i64,
    user_id: String,
    id: String,
    creation_date_time: String,
    file_name: String,
}

impl HotelCreatedRecord {
    /// The creation time rendered in its canonical form.
    pub fn canonical_creation_date_time(&self) -> String {
        canonical_timestamp(&self.creation_date_time)
    }
}

/// Decodes a snake_case JSON payload. Every field is required and unknown fields are rejected.
pub fn decode(payload: &[u8]) -> Result<HotelCreatedRecord, IndexerError> {
    let payload: HotelCreatedPayload = serde_json::from_slice(payload)
        .map_err(|error| IndexerError::Decode(error.to_string()))?;

    if payload.id.trim().is_empty() {
        return Err(IndexerError::Decode("field `id` must not be empty".to_owned()));
    }

    let creation_date_time = parse_creation_date_time(&payload.creation_date_time)?;
    Ok(HotelCreatedRecord {
        name: payload.name,
        city_name: payload.city_name,
        price: payload.price,
        rating: payload.rating,
        user_id: payload.user_id,
        id: payload.id,
        creation_date_time,
        file_name: payload.file_name,
    })
}

/// Parses an ISO-8601 date or date-time.
///
/// The date is a calendar date (`2024-05-01`, `20240501`) or a week date
/// (`2024-W18-3`, `2024W183`, `2024-W18`). It may be followed by `T`, `t` or a
/// space and a time in extended (`10:15:30`) or basic (`101530`) format,
/// truncated to hours or minutes, with a `.` or `,` fraction of a second
/// (digits past microseconds are dropped) and a `Z` or `+hh[[:]mm[[:]ss]]`
/// offset. Values without an offset are taken as UTC, a bare date as midnight
/// UTC. Surrounding whitespace is rejected.
pub fn parse_creation_date_time(value: &str) -> Result<DateTime<Utc>, IndexerError> {
    let invalid = |reason: &str| IndexerError::DateFormat {
        value: value.to_owned(),
        reason: reason.to_owned(),
    };

    let (date, time) = match value.split_once(['T', 't', ' ']) {
        Some((date, time)) => (date, Some(time)),
        None => (value, None),
    };
    let date = parse_date(date).ok_or_else(|| invalid("not an ISO-8601 date"))?;
    let Some(time) = time else {
        return Ok(date.and_time(NaiveTime::default()).and_utc());
    };

    let (clock, offset) =
        split_offset(time).ok_or_else(|| invalid("not an ISO-8601 UTC offset"))?;
    let time = parse_time(clock).ok_or_else(|| invalid("not an ISO-8601 time"))?;
    let date_time = date.and_time(time);
    match offset {
        None => Ok(date_time.and_utc()),
        Some(offset) => offset
            .from_local_datetime(&date_time)
            .single()
            .map(|date_time| date_time.with_timezone(&Utc))
            .ok_or_else(|| invalid("out of range")),
    }
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    if !value.is_ascii() {
        return None;
    }

    let year = fixed_digits(value.get(..4)?, 4).filter(|year| *year > 0)? as i32;
    let (extended, rest) = match value[4..].strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, &value[4..]),
    };

    if let Some(week_date) = rest.strip_prefix('W') {
        let (week, weekday) = if extended {
            match week_date.split_once('-') {
                Some((week, weekday)) => (week, Some(weekday)),
                None => (week_date, None),
            }
        } else {
            (week_date.get(..2)?, week_date.get(2..).filter(|day| !day.is_empty()))
        };
        let weekday = match weekday {
            Some(weekday) => fixed_digits(weekday, 1).filter(|day| (1..=7).contains(day))?,
            None => 1,
        };
        return NaiveDate::from_isoywd_opt(year, fixed_digits(week, 2)?, Weekday::Mon)?
            .checked_add_days(Days::new(u64::from(weekday - 1)));
    }

    let (month, day) = if extended {
        rest.split_once('-')?
    } else {
        (rest.get(..2)?, rest.get(2..)?)
    };
    NaiveDate::from_ymd_opt(year, fixed_digits(month, 2)?, fixed_digits(day, 2)?)
}

/// Splits a time into its clock and UTC offset. `None` when the offset is malformed.
fn split_offset(time: &str) -> Option<(&str, Option<FixedOffset>)> {
    if let Some(clock) = time.strip_suffix(['Z', 'z']) {
        return Some((clock, Some(Utc.fix())));
    }

    match time.find(['+', '-']) {
        Some(position) => {
            let (clock, offset) = time.split_at(position);
            Some((clock, Some(parse_offset(offset)?)))
        }
        None => Some((time, None)),
    }
}

fn parse_offset(value: &str) -> Option<FixedOffset> {
    let (sign, clock) = match value.split_at_checked(1)? {
        ("+", clock) => (1, clock),
        ("-", clock) => (-1, clock),
        _ => return None,
    };

    let (hours, minutes, seconds, micros) = parse_clock(clock)?;
    if micros != 0 || minutes > 59 || seconds > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60 + seconds) as i32)
}

fn parse_time(value: &str) -> Option<NaiveTime> {
    let (hours, minutes, seconds, micros) = parse_clock(value)?;
    NaiveTime::from_hms_micro_opt(hours, minutes, seconds, micros)
}

/// Reads `hh[:mm[:ss[.f]]]` or `hh[mm[ss[.f]]]` into hours, minutes, seconds
/// and microseconds.
fn parse_clock(value: &str) -> Option<(u32, u32, u32, u32)> {
    let (clock, fraction) = match value.split_once(['.', ',']) {
        Some((clock, fraction)) => (clock, Some(fraction)),
        None => (value, None),
    };
    if clock.is_empty() || !clock.is_ascii() {
        return None;
    }

    let parts = if clock.contains(':') {
        clock.split(':').collect::<Vec<_>>()
    } else {
        (0..clock.len())
            .step_by(2)
            .map(|position| clock.get(position..position + 2))
            .collect::<Option<Vec<_>>>()?
    };
    if parts.len() > 3 {
        return None;
    }

    let mut fields = [0; 3];
    for (field, part) in fields.iter_mut().zip(&parts) {
        *field = fixed_digits(part, 2)?;
    }

    let micros = match fraction {
        None => 0,
        Some(fraction) if parts.len() == 3 => parse_micros(fraction)?,
        Some(_) => return None,
    };
    Some((fields[0], fields[1], fields[2], micros))
}

fn parse_micros(fraction: &str) -> Option<u32> {
    if fraction.is_empty() || !fraction.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }

    let digits = &fraction[..fraction.len().min(6)];
    let micros = digits.parse::<u32>().ok()?;
    Some(micros * 10u32.pow(6 - digits.len() as u32))
}

fn fixed_digits(value: &str, width: usize) -> Option<u32> {
    if value.len() != width || !value.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}

pub fn canonical_timestamp(date_time: &DateTime<Utc>) -> String {
    date_time.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use test_case::test_case;

    fn payload() -> Value {
        json!({
            "name": "Grand Budapest",
            "city_name": "Zubrowka",
            "price": 180,
            "rating": 5,
            "user_id": "u-42",
            "id": "h-123",
            "creation_date_time": "2024-05-01T10:15:30",
            "file_name": "grand-budapest.jpg"
        })
    }

    fn encode(value: &Value) -> Vec<u8> {
        serde_json::to_vec(value).unwrap()
    }

    #[test]
    fn given_valid_payload_should_decode_all_fields() {
        let record = decode(&encode(&payload())).unwrap();

        assert_eq!(record.name, "Grand Budapest");
        assert_eq!(record.city_name, "Zubrowka");
        assert_eq!(record.price, 180);
        assert_eq!(record.rating, 5);
        assert_eq!(record.user_id, "u-42");
        assert_eq!(record.id, "h-123");
        assert_eq!(record.file_name, "grand-budapest.jpg");
        assert_eq!(record.canonical_creation_date_time(), "2024-05-01T10:15:30Z");
    }

    #[test]
    fn given_valid_payload_should_keep_id_unchanged() {
        let mut value = payload();
        value["id"] = json!("  7f3c-ÄÖ-hotel  ");
        let record = decode(&encode(&value)).unwrap();
        assert_eq!(record.id, "  7f3c-ÄÖ-hotel  ");
    }

    #[test]
    fn given_out_of_range_price_and_rating_should_still_decode() {
        let mut value = payload();
        value["price"] = json!(-10);
        value["rating"] = json!(11);
        let record = decode(&encode(&value)).unwrap();
        assert_eq!(record.price, -10);
        assert_eq!(record.rating, 11);
    }

    #[test_case("name")]
    #[test_case("city_name")]
    #[test_case("price")]
    #[test_case("rating")]
    #[test_case("user_id")]
    #[test_case("id")]
    #[test_case("creation_date_time")]
    #[test_case("file_name")]
    fn given_missing_field_should_fail_with_decode_error(field: &str) {
        let mut value = payload();
        value.as_object_mut().unwrap().remove(field);

        let error = decode(&encode(&value)).unwrap_err();
        assert!(
            matches!(&error, IndexerError::Decode(reason) if reason.contains(field)),
            "unexpected error: {error}"
        );
    }

    #[test]
    fn given_unknown_field_should_fail_with_decode_error() {
        let mut value = payload();
        value["stars"] = json!(4);
        let error = decode(&encode(&value)).unwrap_err();
        assert!(matches!(error, IndexerError::Decode(_)));
    }

    #[test]
    fn given_camel_case_payload_should_fail_with_decode_error() {
        let value = json!({
            "name": "Grand Budapest",
            "cityName": "Zubrowka",
            "price": 180,
            "rating": 5,
            "userId": "u-42",
            "id": "h-123",
            "creationDateTime": "2024-05-01T10:15:30",
            "fileName": "grand-budapest.jpg"
        });
        let error = decode(&encode(&value)).unwrap_err();
        assert!(matches!(error, IndexerError::Decode(_)));
    }

    #[test]
    fn given_fractional_price_should_fail_with_decode_error() {
        let mut value = payload();
        value["price"] = json!(180.5);
        let error = decode(&encode(&value)).unwrap_err();
        assert!(matches!(error, IndexerError::Decode(_)));
    }

    #[test]
    fn given_empty_id_should_fail_with_decode_error() {
        let mut value = payload();
        value["id"] = json!("");
        let error = decode(&encode(&value)).unwrap_err();
        assert!(matches!(error, IndexerError::Decode(_)));
    }

    #[test]
    fn given_malformed_json_should_fail_with_decode_error() {
        let error = decode(b"{\"name\": ").unwrap_err();
        assert!(matches!(error, IndexerError::Decode(_)));
    }

    #[test_case("yesterday")]
    #[test_case("2024-13-01T10:00:00")]
    #[test_case("2024-02-30")]
    #[test_case("01/05/2024 10:15")]
    #[test_case("")]
    #[test_case(" 2024-05-01T10:15:30 " ; "surrounding whitespace")]
    #[test_case("2024-05-01T10:15:30 " ; "trailing whitespace")]
    #[test_case("2024-5-1" ; "unpadded calendar date")]
    #[test_case("2024-05-01T" ; "missing time after separator")]
    #[test_case("2024-05-01T10:15.5" ; "fraction of a minute")]
    #[test_case("2024-05-01T25:00" ; "hour out of range")]
    #[test_case("2024-05-01T10:15:30+2" ; "single digit offset")]
    #[test_case("2024-W54-1" ; "week out of range")]
    #[test_case("2024-W18-8" ; "weekday out of range")]
    #[test_case("0000-01-01" ; "year zero")]
    fn given_unparseable_creation_date_time_should_fail_with_date_format_error(value: &str) {
        let mut payload = payload();
        payload["creation_date_time"] = json!(value);

        let error = decode(&encode(&payload)).unwrap_err();
        assert!(matches!(error, IndexerError::DateFormat { .. }));
    }

    #[test_case("2024-05-01T10:15:30", "2024-05-01T10:15:30Z")]
    #[test_case("2024-05-01 10:15:30", "2024-05-01T10:15:30Z")]
    #[test_case("2024-05-01T10:15:30Z", "2024-05-01T10:15:30Z")]
    #[test_case("2024-05-01T12:15:30+02:00", "2024-05-01T10:15:30Z")]
    #[test_case("2024-05-01T05:15:30-05:00", "2024-05-01T10:15:30Z")]
    #[test_case("2024-05-01T10:15:30.250", "2024-05-01T10:15:30.250Z")]
    #[test_case("2024-05-01T10:15:30.123456+00:00", "2024-05-01T10:15:30.123456Z")]
    #[test_case("2024-05-01T10:15", "2024-05-01T10:15:00Z")]
    #[test_case("2024-05-01T12:15+02:00", "2024-05-01T10:15:00Z")]
    #[test_case("2024-05-01", "2024-05-01T00:00:00Z")]
    #[test_case("2024-05-01T10:15:30+02", "2024-05-01T08:15:30Z" ; "hour only offset")]
    #[test_case("2024-05-01T10:15:30-0330", "2024-05-01T13:45:30Z" ; "basic offset")]
    #[test_case("20240501T101530", "2024-05-01T10:15:30Z" ; "basic date time")]
    #[test_case("20240501T101530.25Z", "2024-05-01T10:15:30.250Z" ; "basic date time with fraction")]
    #[test_case("20240501", "2024-05-01T00:00:00Z" ; "basic date")]
    #[test_case("2024-05-01T10", "2024-05-01T10:00:00Z" ; "hour only time")]
    #[test_case("2024-05-01t1015", "2024-05-01T10:15:00Z" ; "lowercase separator basic time")]
    #[test_case("2024-05-01T10:15:30,5", "2024-05-01T10:15:30.500Z" ; "comma decimal sign")]
    #[test_case("2024-05-01T10:15:30.1234567", "2024-05-01T10:15:30.123456Z" ; "fraction past microseconds")]
    #[test_case("2024-W18-3", "2024-05-01T00:00:00Z" ; "week date")]
    #[test_case("2024W183T10:15Z", "2024-05-01T10:15:00Z" ; "basic week date time")]
    #[test_case("2024-W18", "2024-04-29T00:00:00Z" ; "week without weekday")]
    fn given_iso_8601_variant_should_normalize_to_canonical_utc(input: &str, expected: &str) {
        let parsed = parse_creation_date_time(input).unwrap();
        assert_eq!(canonical_timestamp(&parsed), expected);
    }

    #[test]
    fn given_equivalent_instants_should_render_identically() {
        let first = parse_creation_date_time("2024-05-01T12:15:30+02:00").unwrap();
        let second = parse_creation_date_time("2024-05-01T10:15:30.000Z").unwrap();
        assert_eq!(canonical_timestamp(&first), canonical_timestamp(&second));
    }

    #[test]
    fn given_canonical_output_should_parse_back_to_same_instant() {
        let parsed = parse_creation_date_time("2024-05-01T12:15:30.5+02:00").unwrap();
        let canonical = canonical_timestamp(&parsed);
        assert_eq!(parse_creation_date_time(&canonical).unwrap(), parsed);
    }
}
