use std::cmp::Ordering;
use std::fmt::{self, Display, Formatter};
use std::ops;
use std::str::FromStr;

use num_bigint::{BigInt, Sign};
use num_traits::{Signed, Zero};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::cnf::{DECIMAL_PRECISION, MAX_DECIMAL_EXPONENT};
use crate::err::Error;

/// A fixed-point number with eight implied fractional digits, backed by an
/// arbitrary-precision integer.
///
/// A decimal may be nil, which is distinct from zero. Nil is the identity for
/// addition and subtraction, while every other arithmetic operation with a nil
/// operand yields zero. Comparisons against nil are never strictly ordered,
/// which is why this type does not implement [`PartialOrd`]; use
/// [`Decimal::compare`] and the named comparison methods instead.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Decimal(Option<BigInt>);

fn scale() -> BigInt {
	BigInt::from(10u64.pow(DECIMAL_PRECISION))
}

fn pow10(exp: u32) -> BigInt {
	num_traits::pow(BigInt::from(10), exp as usize)
}

/// Euclidean remainder, always in `0..|m|`.
fn euclid_mod(a: &BigInt, m: &BigInt) -> BigInt {
	let r = a % m;
	if r.is_negative() {
		r + m.abs()
	} else {
		r
	}
}

/// Parses plain (non-scientific) decimal notation into the scaled integer.
fn parse_plain(input: &str) -> Option<BigInt> {
	let (neg, body) = match input.as_bytes().first() {
		Some(b'-') => (true, &input[1..]),
		Some(b'+') => (false, &input[1..]),
		_ => (false, input),
	};
	let (int, frac) = match body.split_once('.') {
		Some((int, frac)) => (int, frac),
		None => (body, ""),
	};
	if int.is_empty() && frac.is_empty() {
		return None;
	}
	if !int.bytes().chain(frac.bytes()).all(|b| b.is_ascii_digit()) {
		return None;
	}
	let places = DECIMAL_PRECISION as usize;
	let mut digits = String::with_capacity(int.len() + places + 1);
	digits.push_str(if int.is_empty() {
		"0"
	} else {
		int
	});
	digits.extend(frac.chars().chain(std::iter::repeat('0')).take(places));
	let value = BigInt::parse_bytes(digits.as_bytes(), 10)?;
	Some(if neg {
		-value
	} else {
		value
	})
}

fn parse(input: &str) -> Result<BigInt, Error> {
	let invalid = || Error::InvalidDecimal(input.to_owned());
	let v = input.trim();
	match v.find(['e', 'E']) {
		Some(i) => {
			let base = parse_plain(&v[..i]).ok_or_else(invalid)?;
			let exp: i32 = v[i + 1..].parse().map_err(|_| invalid())?;
			if exp > MAX_DECIMAL_EXPONENT as i32 {
				return Err(invalid());
			}
			// Shifting right past every digit leaves only the floor
			if exp < 0 && exp.unsigned_abs() as usize > base.magnitude().to_string().len() {
				return Ok(if base.is_negative() {
					BigInt::from(-1)
				} else {
					BigInt::zero()
				});
			}
			let shift = pow10(exp.unsigned_abs());
			if exp >= 0 {
				Ok(base * shift)
			} else {
				let rem = euclid_mod(&base, &shift);
				Ok((base - rem) / shift)
			}
		}
		None => parse_plain(v).ok_or_else(invalid),
	}
}

impl Decimal {
	/// The nil decimal.
	pub fn nil() -> Self {
		Self(None)
	}

	/// Zero, which is not nil.
	pub fn zero() -> Self {
		Self(Some(BigInt::zero()))
	}

	/// Builds a decimal from its raw scaled representation, so that
	/// `from_raw(1)` is `0.00000001`.
	pub fn from_raw(raw: impl Into<BigInt>) -> Self {
		Self(Some(raw.into()))
	}

	/// The smallest step at the given number of fractional digits, so that
	/// `from_precision(2)` is `0.01`. Precisions above eight are clamped.
	pub fn from_precision(precision: u32) -> Self {
		let precision = precision.min(DECIMAL_PRECISION);
		Self::from_raw(pow10(DECIMAL_PRECISION - precision))
	}

	/// Converts a float, truncating anything beyond eight fractional digits.
	pub fn from_f64(f: f64) -> Self {
		if !f.is_finite() {
			return Self::zero();
		}
		let floor = f.floor();
		let frac = ((f - floor) * 10f64.powi(DECIMAL_PRECISION as i32)) as i64;
		Self::from_raw(BigInt::from(floor as i64) * scale() + frac)
	}

	/// The raw scaled integer, if not nil.
	pub fn raw(&self) -> Option<&BigInt> {
		self.0.as_ref()
	}

	pub fn is_nil(&self) -> bool {
		self.0.is_none()
	}

	/// Nil counts as zero.
	pub fn is_zero(&self) -> bool {
		self.0.as_ref().is_none_or(|i| i.is_zero())
	}

	/// Returns -1, 0 or 1. Nil has no sign.
	pub fn signum(&self) -> i32 {
		match self.0.as_ref().map(|i| i.sign()) {
			Some(Sign::Minus) => -1,
			Some(Sign::Plus) => 1,
			_ => 0,
		}
	}

	pub fn abs(&self) -> Self {
		Self(self.0.as_ref().map(|i| i.abs()))
	}

	pub fn to_f64(&self) -> f64 {
		self.to_string().parse().unwrap_or_default()
	}

	/// The integer part, truncated toward zero.
	pub fn to_i64(&self) -> i64 {
		self.to_f64() as i64
	}

	fn plus(&self, rhs: &Self) -> Self {
		match (&self.0, &rhs.0) {
			(None, _) => rhs.clone(),
			(_, None) => self.clone(),
			(Some(a), Some(b)) => Self::from_raw(a + b),
		}
	}

	fn minus(&self, rhs: &Self) -> Self {
		match (&self.0, &rhs.0) {
			(None, _) => rhs.negate(),
			(_, None) => self.clone(),
			(Some(a), Some(b)) => Self::from_raw(a - b),
		}
	}

	fn times(&self, rhs: &Self) -> Self {
		match (&self.0, &rhs.0) {
			(Some(a), Some(b)) => Self::from_raw(a * b / scale()),
			_ => Self::zero(),
		}
	}

	/// Division truncates toward zero. Dividing by zero yields zero.
	fn over(&self, rhs: &Self) -> Self {
		match (&self.0, &rhs.0) {
			(Some(a), Some(b)) if !b.is_zero() => Self::from_raw(a * scale() / b),
			_ => Self::zero(),
		}
	}

	fn modulo(&self, rhs: &Self) -> Self {
		match (&self.0, &rhs.0) {
			(Some(a), Some(b)) if !b.is_zero() => Self::from_raw(euclid_mod(a, b)),
			_ => Self::zero(),
		}
	}

	fn negate(&self) -> Self {
		Self(self.0.as_ref().map(|i| -i))
	}

	/// Divides the raw representation by a plain integer.
	pub fn raw_div(&self, by: i64) -> Self {
		match &self.0 {
			Some(a) if by != 0 => Self::from_raw(a / by),
			_ => Self::zero(),
		}
	}

	/// Raises to the integer part of `exp`. Negative exponents divide.
	///
	/// Exponents beyond [`MAX_DECIMAL_EXPONENT`] in magnitude yield zero,
	/// except for a base of one or minus one.
	pub fn pow(&self, exp: &Self) -> Self {
		if self.is_nil() || exp.is_nil() {
			return Self::zero();
		}
		let n = exp.to_i64();
		let one = Self::from(1);
		if *self == one {
			return one;
		}
		if self.negate() == one {
			return if n % 2 == 0 {
				one
			} else {
				self.clone()
			};
		}
		if n.unsigned_abs() > MAX_DECIMAL_EXPONENT as u64 {
			return Self::zero();
		}
		(0..n.unsigned_abs()).fold(one, |acc, _| {
			if n > 0 {
				acc.times(self)
			} else {
				acc.over(self)
			}
		})
	}

	/// Splits into the value truncated to `decimals` fractional digits, the
	/// removed remainder and the divisor used.
	fn truncate(&self, decimals: u32) -> Option<(BigInt, BigInt, BigInt)> {
		let a = self.0.as_ref()?;
		let divisor = pow10(DECIMAL_PRECISION - decimals);
		let rem = euclid_mod(a, &divisor);
		Some((a - &rem, rem, divisor))
	}

	pub fn floor(&self, decimals: u32) -> Self {
		if decimals >= DECIMAL_PRECISION && !self.is_nil() {
			return self.clone();
		}
		match self.truncate(decimals) {
			Some((floor, _, _)) => Self::from_raw(floor),
			None => Self::zero(),
		}
	}

	pub fn ceil(&self, decimals: u32) -> Self {
		if decimals >= DECIMAL_PRECISION && !self.is_nil() {
			return self.clone();
		}
		match self.truncate(decimals) {
			Some((floor, rem, _)) if rem.is_zero() => Self::from_raw(floor),
			Some((floor, _, divisor)) => Self::from_raw(floor + divisor),
			None => Self::zero(),
		}
	}

	/// Rounds half up: a remainder of exactly half the step rounds up.
	pub fn round(&self, decimals: u32) -> Self {
		if decimals >= DECIMAL_PRECISION && !self.is_nil() {
			return self.clone();
		}
		match self.truncate(decimals) {
			Some((floor, rem, divisor)) if &rem * 2u32 >= divisor => Self::from_raw(floor + divisor),
			Some((floor, _, _)) => Self::from_raw(floor),
			None => Self::zero(),
		}
	}

	/// Rounds down to a multiple of `step`.
	pub fn round_by_step(&self, step: &Self) -> Self {
		self.minus(&self.modulo(step))
	}

	/// Rounds up to a multiple of `step`.
	pub fn round_up_by_step(&self, step: &Self) -> Self {
		let n = self.round_by_step(step);
		if n.lt(self) {
			n.plus(step)
		} else {
			n
		}
	}

	/// Orders two decimals. Both nil compare equal, nil against a value
	/// has no ordering.
	pub fn compare(&self, other: &Self) -> Option<Ordering> {
		match (&self.0, &other.0) {
			(None, None) => Some(Ordering::Equal),
			(Some(a), Some(b)) => Some(a.cmp(b)),
			_ => None,
		}
	}

	fn strict(&self, other: &Self) -> Option<Ordering> {
		match (&self.0, &other.0) {
			(Some(a), Some(b)) => Some(a.cmp(b)),
			_ => None,
		}
	}

	pub fn gt(&self, other: &Self) -> bool {
		self.strict(other) == Some(Ordering::Greater)
	}

	pub fn lt(&self, other: &Self) -> bool {
		self.strict(other) == Some(Ordering::Less)
	}

	pub fn gte(&self, other: &Self) -> bool {
		matches!(self.strict(other), Some(Ordering::Greater | Ordering::Equal))
	}

	pub fn lte(&self, other: &Self) -> bool {
		matches!(self.strict(other), Some(Ordering::Less | Ordering::Equal))
	}

	/// The larger value, or `other` when the two can not be ordered.
	pub fn greatest(&self, other: &Self) -> Self {
		if self.gt(other) {
			self.clone()
		} else {
			other.clone()
		}
	}

	/// The smaller value, or `other` when the two can not be ordered.
	pub fn least(&self, other: &Self) -> Self {
		if self.lt(other) {
			self.clone()
		} else {
			other.clone()
		}
	}

	/// Like [`Decimal::greatest`] but a nil side always loses.
	pub fn highest(&self, other: &Self) -> Self {
		match (&self.0, &other.0) {
			(None, _) => other.clone(),
			(_, None) => self.clone(),
			_ => self.greatest(other),
		}
	}

	/// Like [`Decimal::least`] but a nil side always loses.
	pub fn lowest(&self, other: &Self) -> Self {
		match (&self.0, &other.0) {
			(None, _) => other.clone(),
			(_, None) => self.clone(),
			_ => self.least(other),
		}
	}

	/// The canonical string form: up to eight fractional digits with
	/// trailing zeros stripped. Nil renders as `0`.
	fn canonical(&self) -> String {
		let Some(i) = &self.0 else {
			return "0".to_owned();
		};
		let places = DECIMAL_PRECISION as usize;
		let mut digits = i.magnitude().to_string();
		if digits.len() <= places {
			digits = format!("{digits:0>width$}", width = places + 1);
		}
		let (int, frac) = digits.split_at(digits.len() - places);
		let frac = frac.trim_end_matches('0');
		let sign = if i.is_negative() {
			"-"
		} else {
			""
		};
		match frac.is_empty() {
			true => format!("{sign}{int}"),
			false => format!("{sign}{int}.{frac}"),
		}
	}
}

impl From<i64> for Decimal {
	fn from(v: i64) -> Self {
		Self::from_raw(BigInt::from(v) * scale())
	}
}

impl From<i32> for Decimal {
	fn from(v: i32) -> Self {
		Self::from(v as i64)
	}
}

impl FromStr for Decimal {
	type Err = Error;
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		parse(s).map(Self::from_raw)
	}
}

impl TryFrom<&str> for Decimal {
	type Error = Error;
	fn try_from(s: &str) -> Result<Self, Self::Error> {
		s.parse()
	}
}

impl Display for Decimal {
	/// Honours a precision, so `{:.2}` pads or truncates to two digits and
	/// `{:.0}` prints the integer part only.
	fn fmt(&self, f: &mut Formatter) -> fmt::Result {
		let val = self.canonical();
		let Some(p) = f.precision() else {
			return f.write_str(&val);
		};
		let (int, frac) = val.split_once('.').unwrap_or((val.as_str(), ""));
		if p == 0 {
			return f.write_str(int);
		}
		let frac: String = frac.chars().chain(std::iter::repeat('0')).take(p).collect();
		write!(f, "{int}.{frac}")
	}
}

macro_rules! impl_op {
	($trait:ident, $method:ident, $inner:ident) => {
		impl ops::$trait for Decimal {
			type Output = Decimal;
			fn $method(self, rhs: Decimal) -> Decimal {
				self.$inner(&rhs)
			}
		}

		impl ops::$trait<&Decimal> for &Decimal {
			type Output = Decimal;
			fn $method(self, rhs: &Decimal) -> Decimal {
				self.$inner(rhs)
			}
		}
	};
}

impl_op!(Add, add, plus);
impl_op!(Sub, sub, minus);
impl_op!(Mul, mul, times);
impl_op!(Div, div, over);
impl_op!(Rem, rem, modulo);

impl ops::Neg for Decimal {
	type Output = Decimal;
	fn neg(self) -> Decimal {
		self.negate()
	}
}

impl ops::Neg for &Decimal {
	type Output = Decimal;
	fn neg(self) -> Decimal {
		self.negate()
	}
}

impl Serialize for Decimal {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		match self.0 {
			None => serializer.serialize_none(),
			Some(_) => serializer.serialize_str(&self.canonical()),
		}
	}
}

struct DecimalVisitor;

impl<'de> Visitor<'de> for DecimalVisitor {
	type Value = Decimal;

	fn expecting(&self, f: &mut Formatter) -> fmt::Result {
		f.write_str("a decimal string")
	}

	fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
		if v.is_empty() {
			return Ok(Decimal::nil());
		}
		v.parse().map_err(E::custom)
	}

	fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
		Ok(Decimal::from(v))
	}

	fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
		Ok(Decimal::from_raw(BigInt::from(v) * scale()))
	}

	fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
		v.to_string().parse().map_err(E::custom)
	}

	fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
		Ok(Decimal::nil())
	}

	fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
		Ok(Decimal::nil())
	}

	fn visit_some<D: Deserializer<'de>>(self, d: D) -> Result<Self::Value, D::Error> {
		d.deserialize_any(self)
	}
}

impl<'de> Deserialize<'de> for Decimal {
	fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
		d.deserialize_any(DecimalVisitor)
	}
}
