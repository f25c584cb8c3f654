//! Value string parsing
//!
//! A value string is the server-supplied program for a revision check:
//!
//! ```text
//! A=3845581634 B=880823580 C=1363937103 4 A=A-S B=B-C C=C-A A=A+B
//! ```
//!
//! Seed tokens (`X=<decimal>`) give the starting values of the persistent
//! registers, the bare number is the operation count, and the remaining
//! tokens are operations applied to every 32-bit word of file data.

use crate::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// One of the four checksum registers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
    /// Persistent register A, XORed with the MPQ hash code before the run
    A = 0,
    /// Persistent register B
    B = 1,
    /// Persistent register C, holds the result
    C = 2,
    /// Transient register, reloaded from file data for every word
    S = 3,
}

impl Register {
    /// Index of this register in a `[u32; 4]` register file
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    fn from_char(c: char) -> Option<Self> {
        match c {
            'A' => Some(Register::A),
            'B' => Some(Register::B),
            'C' => Some(Register::C),
            'S' => Some(Register::S),
            _ => None,
        }
    }

    fn as_char(self) -> char {
        match self {
            Register::A => 'A',
            Register::B => 'B',
            Register::C => 'C',
            Register::S => 'S',
        }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Binary operator of a formula
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// Wrapping addition
    Add,
    /// Wrapping subtraction
    Sub,
    /// Wrapping multiplication
    Mul,
    /// Unsigned truncating division
    Div,
    /// Bitwise XOR
    Xor,
    /// Bitwise OR
    Or,
    /// Bitwise AND
    And,
}

impl Operator {
    fn from_char(c: char) -> Option<Self> {
        match c {
            '+' => Some(Operator::Add),
            '-' => Some(Operator::Sub),
            '*' => Some(Operator::Mul),
            '/' => Some(Operator::Div),
            '^' => Some(Operator::Xor),
            '|' => Some(Operator::Or),
            '&' => Some(Operator::And),
            _ => None,
        }
    }

    fn as_char(self) -> char {
        match self {
            Operator::Add => '+',
            Operator::Sub => '-',
            Operator::Mul => '*',
            Operator::Div => '/',
            Operator::Xor => '^',
            Operator::Or => '|',
            Operator::And => '&',
        }
    }

    /// Apply the operator, returning `None` only for division by zero
    #[inline]
    pub fn apply(self, lhs: u32, rhs: u32) -> Option<u32> {
        match self {
            Operator::Add => Some(lhs.wrapping_add(rhs)),
            Operator::Sub => Some(lhs.wrapping_sub(rhs)),
            Operator::Mul => Some(lhs.wrapping_mul(rhs)),
            Operator::Div => lhs.checked_div(rhs),
            Operator::Xor => Some(lhs ^ rhs),
            Operator::Or => Some(lhs | rhs),
            Operator::And => Some(lhs & rhs),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// A single `dest = lhs op rhs` formula
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Operation {
    /// Register receiving the result
    pub dest: Register,
    /// Operator
    pub op: Operator,
    /// Left operand
    pub lhs: Register,
    /// Right operand
    pub rhs: Register,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}{}{}", self.dest, self.lhs, self.op, self.rhs)
    }
}

/// A parsed value string
///
/// Programs carry no register state of their own, so one instance can be
/// shared by any number of concurrent checksum runs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ValueProgram {
    /// Initial value of register A (before the MPQ hash code is applied)
    pub seed_a: u32,
    /// Initial value of register B
    pub seed_b: u32,
    /// Initial value of register C
    pub seed_c: u32,
    /// Operations in the order they run for every word
    pub ops: Vec<Operation>,
}

impl ValueProgram {
    /// Parse a value string
    ///
    /// Unknown registers, unknown operators and stray tokens are rejected
    /// rather than skipped.
    pub fn parse(value: &str) -> Result<Self> {
        let value = value.trim();
        if value.is_empty() {
            return Err(Error::parse(value, "empty value string"));
        }

        let mut seeds = [0u32; 3];
        let mut ops = Vec::new();
        let mut declared_count = None;

        for token in value.split(' ') {
            if token.is_empty() {
                return Err(Error::parse(token, "empty token (repeated separator)"));
            }

            let Some((dest, expr)) = token.split_once('=') else {
                // The bare number ahead of the operations is the operation count
                let count = token
                    .parse::<u32>()
                    .map_err(|_| Error::parse(token, "expected an assignment or operation count"))?;
                declared_count = Some(count);
                continue;
            };

            let mut dest_chars = dest.chars();
            let dest = match (dest_chars.next(), dest_chars.next()) {
                (Some(c), None) => Register::from_char(c)
                    .ok_or_else(|| Error::parse(token, format!("unknown register '{}'", c)))?,
                _ => return Err(Error::parse(token, "destination must be a single register")),
            };

            let Some(first) = expr.chars().next() else {
                return Err(Error::parse(token, "missing right-hand side"));
            };

            if first.is_ascii_digit() {
                let seed = expr
                    .parse::<u32>()
                    .map_err(|e| Error::parse(token, format!("invalid seed value: {}", e)))?;
                match dest {
                    Register::A | Register::B | Register::C => seeds[dest.index()] = seed,
                    Register::S => {
                        return Err(Error::parse(token, "register S cannot be seeded"));
                    }
                }
            } else {
                ops.push(parse_operation(token, dest, expr)?);
            }
        }

        if let Some(count) = declared_count {
            if count as usize != ops.len() {
                log::warn!(
                    "Value string declares {} operations but lists {}",
                    count,
                    ops.len()
                );
            }
        }

        Ok(ValueProgram {
            seed_a: seeds[0],
            seed_b: seeds[1],
            seed_c: seeds[2],
            ops,
        })
    }

    /// Initial register file `[A, B, C, S]` for the given MPQ hash code
    pub fn initial_registers(&self, hash_code: u32) -> [u32; 4] {
        [self.seed_a ^ hash_code, self.seed_b, self.seed_c, 0]
    }
}

fn parse_operation(token: &str, dest: Register, expr: &str) -> Result<Operation> {
    let chars: Vec<char> = expr.chars().collect();
    if chars.len() != 3 {
        return Err(Error::parse(token, "operation must have the form X=YoZ"));
    }

    let register = |c: char| {
        Register::from_char(c)
            .ok_or_else(|| Error::parse(token, format!("unknown register '{}'", c)))
    };

    let lhs = register(chars[0])?;
    let op = Operator::from_char(chars[1])
        .ok_or_else(|| Error::parse(token, format!("unknown operator '{}'", chars[1])))?;
    let rhs = register(chars[2])?;

    Ok(Operation { dest, op, lhs, rhs })
}

impl FromStr for ValueProgram {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ValueProgram::parse(s)
    }
}

/// Canonical form: all three seeds, the operation count, then the operations
impl fmt::Display for ValueProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "A={} B={} C={} {}",
            self.seed_a,
            self.seed_b,
            self.seed_c,
            self.ops.len()
        )?;
        for op in &self.ops {
            write!(f, " {}", op)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_standard_value_string() {
        let program =
            ValueProgram::parse("A=3845581634 B=880823580 C=1363937103 4 A=A-S B=B-C C=C-A A=A+B")
                .unwrap();

        assert_eq!(program.seed_a, 3845581634);
        assert_eq!(program.seed_b, 880823580);
        assert_eq!(program.seed_c, 1363937103);
        assert_eq!(program.ops.len(), 4);
        assert_eq!(
            program.ops[0],
            Operation {
                dest: Register::A,
                op: Operator::Sub,
                lhs: Register::A,
                rhs: Register::S,
            }
        );
        assert_eq!(program.ops[3].op, Operator::Add);
        assert_eq!(program.ops[3].rhs, Register::B);
    }

    #[test]
    fn test_seeds_in_any_order_default_to_zero() {
        let program = ValueProgram::parse("C=9 A=1 2 A=A^S C=C+A").unwrap();
        assert_eq!(program.seed_a, 1);
        assert_eq!(program.seed_b, 0);
        assert_eq!(program.seed_c, 9);
        assert_eq!(program.ops.len(), 2);
    }

    #[test]
    fn test_all_operators() {
        let program = ValueProgram::parse("A=A+B A=A-B A=A*B A=A/B A=A^B A=A|B A=A&B").unwrap();
        let ops: Vec<Operator> = program.ops.iter().map(|o| o.op).collect();
        assert_eq!(
            ops,
            vec![
                Operator::Add,
                Operator::Sub,
                Operator::Mul,
                Operator::Div,
                Operator::Xor,
                Operator::Or,
                Operator::And,
            ]
        );
    }

    #[test]
    fn test_declared_count_mismatch_is_tolerated() {
        let program = ValueProgram::parse("A=746187 B=0 C=746187 4 A=A^S B=B^S C=C^A").unwrap();
        assert_eq!(program.ops.len(), 3);
    }

    #[test]
    fn test_rejects_unknown_register() {
        let err = ValueProgram::parse("A=1 B=2 C=3 1 D=A+B").unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));

        let err = ValueProgram::parse("A=1 1 A=A+X").unwrap_err();
        assert!(err.to_string().contains("unknown register 'X'"));
    }

    #[test]
    fn test_rejects_unknown_operator() {
        let err = ValueProgram::parse("A=1 1 A=A%S").unwrap_err();
        assert!(err.to_string().contains("unknown operator '%'"));
    }

    #[test]
    fn test_rejects_malformed_tokens() {
        assert!(ValueProgram::parse("").is_err());
        assert!(ValueProgram::parse("A=1  B=2").is_err());
        assert!(ValueProgram::parse("A=1 garbage").is_err());
        assert!(ValueProgram::parse("A=").is_err());
        assert!(ValueProgram::parse("AB=1").is_err());
        assert!(ValueProgram::parse("A=A+SS").is_err());
        assert!(ValueProgram::parse("A=4294967296").is_err());
        assert!(ValueProgram::parse("S=5").is_err());
    }

    #[test]
    fn test_display_is_canonical() {
        let program = ValueProgram::parse("C=3 A=1 9 A=A^S C=C*A").unwrap();
        assert_eq!(program.to_string(), "A=1 B=0 C=3 2 A=A^S C=C*A");
    }

    #[test]
    fn test_reparse_is_identical() {
        let text = "A=3845581634 B=880823580 C=1363937103 4 A=A-S B=B-C C=C-A A=A+B";
        let program: ValueProgram = text.parse().unwrap();
        let again: ValueProgram = program.to_string().parse().unwrap();
        assert_eq!(program, again);
    }

    #[test]
    fn test_division_by_zero_is_none() {
        assert_eq!(Operator::Div.apply(10, 0), None);
        assert_eq!(Operator::Div.apply(10, 3), Some(3));
        assert_eq!(Operator::Sub.apply(0, 1), Some(u32::MAX));
        assert_eq!(Operator::Mul.apply(0x10000, 0x10000), Some(0));
    }
}
