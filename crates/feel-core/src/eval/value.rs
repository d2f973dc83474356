//! Runtime values for FEEL evaluation.
//!
//! `Value` represents every value that can exist during evaluation: the
//! scalar kinds, the temporal kinds, durations, lists, contexts, ranges,
//! functions, and error values. All values are immutable once constructed;
//! compound payloads sit behind `Arc` so cloning is cheap.
//!
//! FEEL equality and ordering are partial: comparing values of different
//! kinds has no answer and yields Null at the language level. That is
//! modelled by [`Value::feel_eq`] returning `Option<bool>` and
//! [`Value::compare`] returning `Option<Ordering>`. The derived-style
//! `PartialEq` impl is structural and intended for tests and assertions.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use indexmap::IndexMap;
use rust_decimal::Decimal;

use feel_parser::SpannedExpr;

use super::scope::Scope;
use super::EvalError;

/// A FEEL runtime value.
#[derive(Debug, Clone)]
pub enum Value {
    /// Null value; propagates through most operators.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Arbitrary-precision decimal number.
    Number(Decimal),
    /// Unicode string (Arc for cheap cloning).
    String(Arc<str>),
    /// Calendar date.
    Date(NaiveDate),
    /// Time of day without offset.
    LocalTime(NaiveTime),
    /// Time of day with a fixed UTC offset.
    ZonedTime(NaiveTime, FixedOffset),
    /// Date and time without offset.
    LocalDateTime(NaiveDateTime),
    /// Date and time with a fixed UTC offset.
    ZonedDateTime(DateTime<FixedOffset>),
    /// Signed calendar duration in whole months.
    YearMonthDuration(YearMonthDuration),
    /// Signed exact duration in nanoseconds.
    DayTimeDuration(DayTimeDuration),
    /// Ordered, possibly heterogeneous sequence.
    List(Arc<[Value]>),
    /// Ordered name-to-value mapping with unique names.
    Context(Arc<ContextValue>),
    /// Interval with open/closed/unbounded endpoints.
    Range(Arc<RangeValue>),
    /// First-class function closing over its definition environment.
    Function(Arc<FunctionValue>),
    /// Surfaced evaluation failure; distinct from Null.
    Error(Arc<EvalError>),
}

/// A signed years-and-months duration, normalized to a month count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct YearMonthDuration {
    /// Total signed months.
    pub months: i64,
}

impl YearMonthDuration {
    /// Create a duration from years and months.
    pub fn new(years: i64, months: i64) -> Self {
        Self {
            months: years * 12 + months,
        }
    }

    /// Create a duration from a total month count.
    pub fn from_months(months: i64) -> Self {
        Self { months }
    }

    /// Whole years component (truncated toward zero).
    pub fn years(&self) -> i64 {
        self.months / 12
    }

    /// Months component after removing whole years.
    pub fn months_part(&self) -> i64 {
        self.months % 12
    }

    pub fn is_negative(&self) -> bool {
        self.months < 0
    }
}

impl fmt::Display for YearMonthDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.months < 0 {
            write!(f, "-")?;
        }
        let years = self.years().abs();
        let months = self.months_part().abs();
        write!(f, "P")?;
        if years != 0 {
            write!(f, "{}Y", years)?;
        }
        if months != 0 || years == 0 {
            write!(f, "{}M", months)?;
        }
        Ok(())
    }
}

/// A signed days-and-time duration, normalized to a nanosecond count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct DayTimeDuration {
    /// Total signed nanoseconds.
    pub nanos: i64,
}

impl DayTimeDuration {
    pub const NANOS_PER_SECOND: i64 = 1_000_000_000;
    pub const NANOS_PER_DAY: i64 = 86_400 * Self::NANOS_PER_SECOND;

    /// Create a duration from a total nanosecond count.
    pub fn from_nanos(nanos: i64) -> Self {
        Self { nanos }
    }

    /// Create a duration from whole seconds.
    pub fn from_seconds(seconds: i64) -> Self {
        Self {
            nanos: seconds * Self::NANOS_PER_SECOND,
        }
    }

    /// Create a duration from whole days.
    pub fn from_days(days: i64) -> Self {
        Self {
            nanos: days * Self::NANOS_PER_DAY,
        }
    }

    pub fn is_negative(&self) -> bool {
        self.nanos < 0
    }

    /// Convert to a chrono duration.
    pub fn to_chrono(&self) -> chrono::Duration {
        chrono::Duration::nanoseconds(self.nanos)
    }
}

impl fmt::Display for DayTimeDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut nanos = self.nanos;
        if nanos < 0 {
            write!(f, "-")?;
            nanos = -nanos;
        }
        let days = nanos / Self::NANOS_PER_DAY;
        nanos %= Self::NANOS_PER_DAY;
        let hours = nanos / (3600 * Self::NANOS_PER_SECOND);
        nanos %= 3600 * Self::NANOS_PER_SECOND;
        let minutes = nanos / (60 * Self::NANOS_PER_SECOND);
        nanos %= 60 * Self::NANOS_PER_SECOND;
        let seconds = nanos / Self::NANOS_PER_SECOND;
        let frac = nanos % Self::NANOS_PER_SECOND;

        write!(f, "P")?;
        if days != 0 {
            write!(f, "{}D", days)?;
        }
        if hours != 0 || minutes != 0 || seconds != 0 || frac != 0 || days == 0 {
            write!(f, "T")?;
            if hours != 0 {
                write!(f, "{}H", hours)?;
            }
            if minutes != 0 {
                write!(f, "{}M", minutes)?;
            }
            if frac != 0 {
                let frac_str = format!("{:09}", frac);
                write!(f, "{}.{}S", seconds, frac_str.trim_end_matches('0'))?;
            } else if seconds != 0 || (hours == 0 && minutes == 0 && days == 0) {
                write!(f, "{}S", seconds)?;
            }
        }
        Ok(())
    }
}

/// An ordered name-to-value mapping with unique names.
#[derive(Debug, Clone, Default)]
pub struct ContextValue {
    entries: IndexMap<String, Value>,
}

impl ContextValue {
    /// Create a new empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context from an iterator of entries. A repeated name
    /// overwrites the earlier entry, preserving its position.
    pub fn from_entries(entries: impl IntoIterator<Item = (String, Value)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// Get an entry by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(name)
    }

    /// Insert an entry.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.entries.insert(name.into(), value);
    }

    /// Check if a name exists.
    pub fn contains_key(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Get the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the context is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over entries in definition order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }

    /// Iterate over entry names in definition order.
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }
}

impl PartialEq for ContextValue {
    fn eq(&self, other: &Self) -> bool {
        // Entry order is preserved but not significant for equality.
        if self.len() != other.len() {
            return false;
        }
        self.iter()
            .all(|(k, v)| other.get(k).is_some_and(|o| v == o))
    }
}

/// One endpoint of a range.
#[derive(Debug, Clone, PartialEq)]
pub enum RangeBoundary {
    /// The endpoint value is excluded.
    Open(Value),
    /// The endpoint value is included.
    Closed(Value),
    /// No endpoint on this side.
    Unbounded,
}

impl RangeBoundary {
    /// The boundary value, if bounded.
    pub fn value(&self) -> Option<&Value> {
        match self {
            RangeBoundary::Open(v) | RangeBoundary::Closed(v) => Some(v),
            RangeBoundary::Unbounded => None,
        }
    }
}

/// An interval over an ordered kind.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeValue {
    pub start: RangeBoundary,
    pub end: RangeBoundary,
}

impl RangeValue {
    pub fn new(start: RangeBoundary, end: RangeBoundary) -> Self {
        Self { start, end }
    }

    /// Membership test. Returns `None` when the range is ill-formed
    /// (lower bound above upper bound) or when the value is not comparable
    /// with the bounds; operations on such ranges yield Null.
    pub fn contains(&self, value: &Value) -> Option<bool> {
        if let (Some(lo), Some(hi)) = (self.start.value(), self.end.value()) {
            match lo.compare(hi) {
                Some(Ordering::Greater) | None => return None,
                _ => {}
            }
        }

        let above_start = match &self.start {
            RangeBoundary::Unbounded => Some(true),
            RangeBoundary::Closed(b) => value.compare(b).map(|o| o != Ordering::Less),
            RangeBoundary::Open(b) => value.compare(b).map(|o| o == Ordering::Greater),
        };
        let below_end = match &self.end {
            RangeBoundary::Unbounded => Some(true),
            RangeBoundary::Closed(b) => value.compare(b).map(|o| o != Ordering::Greater),
            RangeBoundary::Open(b) => value.compare(b).map(|o| o == Ordering::Less),
        };

        match (above_start, below_end) {
            (Some(false), _) | (_, Some(false)) => Some(false),
            (Some(true), Some(true)) => Some(true),
            _ => None,
        }
    }
}

/// The body of a function value.
#[derive(Clone)]
pub enum FunctionBody {
    /// A user-defined function: an AST plus its captured environment.
    Expr {
        body: Arc<SpannedExpr>,
        closure: Arc<Scope>,
    },
    /// A native (built-in) implementation.
    Native(NativeFn),
}

/// A native function implementation over already-evaluated arguments.
pub type NativeFn = Arc<dyn Fn(&[Value]) -> Value + Send + Sync>;

/// A first-class FEEL function.
#[derive(Clone)]
pub struct FunctionValue {
    /// Parameter names; may contain interior spaces.
    pub params: Vec<String>,
    /// When set, the final parameter collects any remaining positional
    /// arguments as a list.
    pub var_args: bool,
    pub body: FunctionBody,
}

impl FunctionValue {
    /// Create a user-defined function closing over `closure`.
    pub fn from_ast(params: Vec<String>, body: SpannedExpr, closure: Arc<Scope>) -> Self {
        Self {
            params,
            var_args: false,
            body: FunctionBody::Expr {
                body: Arc::new(body),
                closure,
            },
        }
    }

    /// Create a native function.
    pub fn native(
        params: &[&str],
        var_args: bool,
        implementation: impl Fn(&[Value]) -> Value + Send + Sync + 'static,
    ) -> Self {
        Self {
            params: params.iter().map(|p| p.to_string()).collect(),
            var_args,
            body: FunctionBody::Native(Arc::new(implementation)),
        }
    }
}

impl fmt::Debug for FunctionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionValue")
            .field("params", &self.params)
            .field("var_args", &self.var_args)
            .field(
                "body",
                &match self.body {
                    FunctionBody::Expr { .. } => "expr",
                    FunctionBody::Native(_) => "native",
                },
            )
            .finish()
    }
}

// ==================== Constructors ====================

impl Value {
    /// Create a string value.
    pub fn string(s: impl Into<Arc<str>>) -> Self {
        Value::String(s.into())
    }

    /// Create a list value.
    pub fn list(items: impl IntoIterator<Item = Value>) -> Self {
        Value::List(items.into_iter().collect::<Vec<_>>().into())
    }

    /// Create a context value from entries.
    pub fn context(entries: impl IntoIterator<Item = (String, Value)>) -> Self {
        Value::Context(Arc::new(ContextValue::from_entries(entries)))
    }

    /// Create an error value.
    pub fn error(err: EvalError) -> Self {
        Value::Error(Arc::new(err))
    }

    /// Check if this value is an error.
    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The FEEL type name of this value, as used by `instance of`.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Date(_) => "date",
            Value::LocalTime(_) | Value::ZonedTime(..) => "time",
            Value::LocalDateTime(_) | Value::ZonedDateTime(_) => "date and time",
            Value::YearMonthDuration(_) => "years and months duration",
            Value::DayTimeDuration(_) => "days and time duration",
            Value::List(_) => "list",
            Value::Context(_) => "context",
            Value::Range(_) => "range",
            Value::Function(_) => "function",
            Value::Error(_) => "error",
        }
    }
}

// ==================== FEEL Equality ====================

impl Value {
    /// FEEL value equality.
    ///
    /// `None` means the comparison has no answer (distinct kinds) and the
    /// `=` operator yields Null. The one concession: comparing anything with
    /// Null is answerable, and true only when both sides are Null.
    pub fn feel_eq(&self, other: &Value) -> Option<bool> {
        match (self, other) {
            (Value::Null, Value::Null) => Some(true),
            (Value::Null, _) | (_, Value::Null) => Some(false),
            (Value::Bool(a), Value::Bool(b)) => Some(a == b),
            // Decimal equality is numeric: 0 = 0.00 is true.
            (Value::Number(a), Value::Number(b)) => Some(a == b),
            (Value::String(a), Value::String(b)) => Some(a == b),
            (Value::Date(a), Value::Date(b)) => Some(a == b),
            (Value::LocalTime(a), Value::LocalTime(b)) => Some(a == b),
            (Value::ZonedTime(a, ao), Value::ZonedTime(b, bo)) => {
                Some(zoned_time_key(a, ao) == zoned_time_key(b, bo))
            }
            (Value::LocalDateTime(a), Value::LocalDateTime(b)) => Some(a == b),
            // chrono compares the instant, so equal moments with different
            // offsets are equal.
            (Value::ZonedDateTime(a), Value::ZonedDateTime(b)) => Some(a == b),
            (Value::YearMonthDuration(a), Value::YearMonthDuration(b)) => Some(a == b),
            (Value::DayTimeDuration(a), Value::DayTimeDuration(b)) => Some(a == b),
            (Value::List(a), Value::List(b)) => {
                if a.len() != b.len() {
                    return Some(false);
                }
                let mut unknown = false;
                for (x, y) in a.iter().zip(b.iter()) {
                    match x.feel_eq(y) {
                        Some(false) => return Some(false),
                        Some(true) => {}
                        None => unknown = true,
                    }
                }
                if unknown {
                    None
                } else {
                    Some(true)
                }
            }
            (Value::Context(a), Value::Context(b)) => {
                // Compared as a set of entries; order is not significant.
                if a.len() != b.len() {
                    return Some(false);
                }
                let mut unknown = false;
                for (name, x) in a.iter() {
                    match b.get(name) {
                        None => return Some(false),
                        Some(y) => match x.feel_eq(y) {
                            Some(false) => return Some(false),
                            Some(true) => {}
                            None => unknown = true,
                        },
                    }
                }
                if unknown {
                    None
                } else {
                    Some(true)
                }
            }
            (Value::Range(a), Value::Range(b)) => {
                let eq_bound = |x: &RangeBoundary, y: &RangeBoundary| match (x, y) {
                    (RangeBoundary::Unbounded, RangeBoundary::Unbounded) => Some(true),
                    (RangeBoundary::Open(u), RangeBoundary::Open(v))
                    | (RangeBoundary::Closed(u), RangeBoundary::Closed(v)) => u.feel_eq(v),
                    _ => Some(false),
                };
                match (eq_bound(&a.start, &b.start), eq_bound(&a.end, &b.end)) {
                    (Some(false), _) | (_, Some(false)) => Some(false),
                    (Some(true), Some(true)) => Some(true),
                    _ => None,
                }
            }
            (Value::Function(a), Value::Function(b)) => Some(Arc::ptr_eq(a, b)),
            _ => None,
        }
    }
}

/// Nanoseconds since UTC midnight for an offset-carrying time of day.
fn zoned_time_key(time: &NaiveTime, offset: &FixedOffset) -> i64 {
    let seconds =
        time.num_seconds_from_midnight() as i64 - offset.local_minus_utc() as i64;
    seconds.rem_euclid(86_400) * 1_000_000_000 + time.nanosecond() as i64
}

// ==================== Structural Equality (tests) ====================

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Error(a), Value::Error(b)) => a == b,
            (a, b) => a.feel_eq(b) == Some(true),
        }
    }
}

// ==================== Ordering ====================

impl Value {
    /// Compare two values, returning an ordering if comparable.
    ///
    /// Ordering is only defined within a single ordered kind; in particular
    /// the two duration kinds are not ordered against each other.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => Some(a.cmp(b)),
            // Strings order by code point.
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
            (Value::LocalTime(a), Value::LocalTime(b)) => Some(a.cmp(b)),
            (Value::ZonedTime(a, ao), Value::ZonedTime(b, bo)) => {
                Some(zoned_time_key(a, ao).cmp(&zoned_time_key(b, bo)))
            }
            (Value::LocalDateTime(a), Value::LocalDateTime(b)) => Some(a.cmp(b)),
            (Value::ZonedDateTime(a), Value::ZonedDateTime(b)) => Some(a.cmp(b)),
            (Value::YearMonthDuration(a), Value::YearMonthDuration(b)) => Some(a.cmp(b)),
            (Value::DayTimeDuration(a), Value::DayTimeDuration(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

// ==================== Conversions ====================

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Number(Decimal::from(i))
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Number(Decimal::from(i))
    }
}

impl From<Decimal> for Value {
    fn from(d: Decimal) -> Self {
        Value::Number(d)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(Arc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(Arc::from(s))
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items.into())
    }
}

// ==================== Display ====================

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Number(v) => write!(f, "{}", v.normalize()),
            Value::String(v) => write!(f, "\"{}\"", v),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::LocalTime(t) => write!(f, "{}", format_time(t)),
            Value::ZonedTime(t, offset) => write!(f, "{}{}", format_time(t), offset),
            Value::LocalDateTime(dt) => {
                write!(f, "{}T{}", dt.date().format("%Y-%m-%d"), format_time(&dt.time()))
            }
            Value::ZonedDateTime(dt) => write!(
                f,
                "{}T{}{}",
                dt.date_naive().format("%Y-%m-%d"),
                format_time(&dt.time()),
                dt.offset()
            ),
            Value::YearMonthDuration(d) => write!(f, "{}", d),
            Value::DayTimeDuration(d) => write!(f, "{}", d),
            Value::List(v) => {
                write!(f, "[")?;
                for (i, elem) in v.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", elem)?;
                }
                write!(f, "]")
            }
            Value::Context(ctx) => {
                write!(f, "{{")?;
                for (i, (name, value)) in ctx.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", name, value)?;
                }
                write!(f, "}}")
            }
            Value::Range(r) => {
                match &r.start {
                    RangeBoundary::Closed(v) => write!(f, "[{}", v)?,
                    RangeBoundary::Open(v) => write!(f, "]{}", v)?,
                    RangeBoundary::Unbounded => write!(f, "]")?,
                }
                write!(f, "..")?;
                match &r.end {
                    RangeBoundary::Closed(v) => write!(f, "{}]", v),
                    RangeBoundary::Open(v) => write!(f, "{}[", v),
                    RangeBoundary::Unbounded => write!(f, "["),
                }
            }
            Value::Function(func) => write!(f, "function({})", func.params.join(", ")),
            Value::Error(e) => write!(f, "error({})", e),
        }
    }
}

/// Render a time of day, with fractional seconds only when present.
fn format_time(t: &NaiveTime) -> String {
    if t.nanosecond() == 0 {
        t.format("%H:%M:%S").to_string()
    } else {
        t.format("%H:%M:%S%.f").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(s: &str) -> Value {
        Value::Number(s.parse().unwrap())
    }

    #[test]
    fn number_equality_is_decimal_equal() {
        assert_eq!(num("0").feel_eq(&num("0.00")), Some(true));
        assert_eq!(num("1.5").feel_eq(&num("1.50")), Some(true));
        assert_eq!(num("1").feel_eq(&num("2")), Some(false));
    }

    #[test]
    fn null_equality_is_total() {
        assert_eq!(Value::Null.feel_eq(&Value::Null), Some(true));
        assert_eq!(Value::Null.feel_eq(&num("1")), Some(false));
        assert_eq!(Value::from("a").feel_eq(&Value::Null), Some(false));
    }

    #[test]
    fn cross_kind_equality_has_no_answer() {
        assert_eq!(num("1").feel_eq(&Value::from("1")), None);
        assert_eq!(Value::from(true).feel_eq(&num("1")), None);
        // No implicit list promotion.
        assert_eq!(num("1").feel_eq(&Value::list([num("1")])), None);
    }

    #[test]
    fn context_equality_ignores_order() {
        let a = Value::context([
            ("x".to_string(), num("1")),
            ("y".to_string(), num("2")),
        ]);
        let b = Value::context([
            ("y".to_string(), num("2")),
            ("x".to_string(), num("1")),
        ]);
        assert_eq!(a.feel_eq(&b), Some(true));

        let c = Value::context([("x".to_string(), num("1"))]);
        assert_eq!(a.feel_eq(&c), Some(false));
    }

    #[test]
    fn list_equality_is_element_wise() {
        let a = Value::list([num("1"), num("2")]);
        let b = Value::list([num("1"), num("2.0")]);
        assert_eq!(a.feel_eq(&b), Some(true));
        assert_eq!(a.feel_eq(&Value::list([num("1")])), Some(false));
    }

    #[test]
    fn durations_are_distinct_kinds() {
        let ym = Value::YearMonthDuration(YearMonthDuration::new(0, 1));
        let dt = Value::DayTimeDuration(DayTimeDuration::from_days(30));
        assert_eq!(ym.feel_eq(&dt), None);
        assert_eq!(ym.compare(&dt), None);
    }

    #[test]
    fn ordering_within_kinds() {
        assert_eq!(num("1").compare(&num("2")), Some(Ordering::Less));
        assert_eq!(
            Value::from("a").compare(&Value::from("b")),
            Some(Ordering::Less)
        );
        assert_eq!(num("1").compare(&Value::from("a")), None);
    }

    #[test]
    fn range_membership() {
        let range = RangeValue::new(
            RangeBoundary::Closed(num("4")),
            RangeBoundary::Closed(num("6")),
        );
        assert_eq!(range.contains(&num("4")), Some(true));
        assert_eq!(range.contains(&num("6")), Some(true));
        assert_eq!(range.contains(&num("7")), Some(false));

        let open = RangeValue::new(
            RangeBoundary::Open(num("4")),
            RangeBoundary::Open(num("6")),
        );
        assert_eq!(open.contains(&num("4")), Some(false));
        assert_eq!(open.contains(&num("5")), Some(true));
        assert_eq!(open.contains(&num("6")), Some(false));
    }

    #[test]
    fn ill_formed_range_has_no_members() {
        let range = RangeValue::new(
            RangeBoundary::Closed(num("6")),
            RangeBoundary::Closed(num("4")),
        );
        assert_eq!(range.contains(&num("5")), None);
    }

    #[test]
    fn unbounded_range_membership() {
        let range = RangeValue::new(RangeBoundary::Unbounded, RangeBoundary::Closed(num("10")));
        assert_eq!(range.contains(&num("-100")), Some(true));
        assert_eq!(range.contains(&num("11")), Some(false));
        assert_eq!(range.contains(&Value::from("a")), None);
    }

    #[test]
    fn duration_display() {
        assert_eq!(
            YearMonthDuration::new(1, 2).to_string(),
            "P1Y2M"
        );
        assert_eq!(YearMonthDuration::from_months(0).to_string(), "P0M");
        assert_eq!(YearMonthDuration::from_months(-13).to_string(), "-P1Y1M");

        assert_eq!(DayTimeDuration::from_days(1).to_string(), "P1D");
        assert_eq!(DayTimeDuration::from_seconds(0).to_string(), "PT0S");
        assert_eq!(
            DayTimeDuration::from_seconds(3_660).to_string(),
            "PT1H1M"
        );
        assert_eq!(
            DayTimeDuration::from_nanos(1_500_000_000).to_string(),
            "PT1.5S"
        );
        assert_eq!(DayTimeDuration::from_seconds(-90).to_string(), "-PT1M30S");
    }

    #[test]
    fn number_display_is_normalized() {
        assert_eq!(num("100000").to_string(), "100000");
        assert_eq!(num("1.50").to_string(), "1.5");
    }

    #[test]
    fn list_and_context_display() {
        let v = Value::list([num("1"), Value::from("a")]);
        assert_eq!(v.to_string(), "[1, \"a\"]");

        let ctx = Value::context([("a".to_string(), num("1"))]);
        assert_eq!(ctx.to_string(), "{a: 1}");
    }
}
