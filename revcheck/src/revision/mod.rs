//! CheckRevision: the client integrity proof
//!
//! The server sends a value string and the name of an MPQ archive; the
//! client runs the value program over three of its game files and answers
//! with the resulting checksum. The archive name selects one of eight
//! constants mixed into register A before the run.
//!
//! ```no_run
//! use revcheck::revision::{compute_checksum, extract_mpq_index};
//!
//! # fn main() -> Result<(), revcheck::Error> {
//! let index = extract_mpq_index("ver-IX86-3.mpq")?;
//! let checksum = compute_checksum(
//!     "A=3845581634 B=880823580 C=1363937103 4 A=A-S B=B-C C=C-A A=A+B",
//!     &["StarCraft.exe", "Storm.dll", "Battle.snp"],
//!     index,
//! )?;
//! println!("{}", checksum);
//! # Ok(())
//! # }
//! ```

mod cache;
mod formula;
mod loader;
mod program;

pub use cache::FormulaCache;
pub use formula::{Operation, Operator, Register, ValueProgram};
pub use loader::{
    pad_buffer, read_padded, stream_padded, PaddedFileLoader, PaddedFileSet, PaddedReader,
    FILE_COUNT, MAX_RETAINED_SETS, PAD_BLOCK,
};
pub use program::{ChecksumPass, CompiledProgram, Evaluate};

use crate::config::{ExecutionMode, RevisionConfig};
use crate::{Error, Result};
use once_cell::sync::Lazy;
use std::path::Path;

/// Constants mixed into register A, selected by the MPQ index
pub const MPQ_HASH_CODES: [u32; 8] = [
    0xE7F4CB62, 0xF6A14FFC, 0xAA5504AF, 0x871FCDC2, 0x11BF6A18, 0xC57292E6, 0x7927D27E,
    0x2FEC8733,
];

/// Look up the hash code for an MPQ index
pub fn mpq_hash_code(mpq_index: usize) -> Result<u32> {
    MPQ_HASH_CODES.get(mpq_index).copied().ok_or_else(|| {
        Error::range(format!(
            "MPQ index {} outside 0..={}",
            mpq_index,
            MPQ_HASH_CODES.len() - 1
        ))
    })
}

/// Whether an archive name denotes a Lockdown check
pub fn is_lockdown(mpq_name: &str) -> bool {
    mpq_name.to_ascii_lowercase().starts_with("lockdown")
}

/// Derive the MPQ index from an archive name
///
/// Accepts `IX86verN.mpq` and `ver-IX86-N.mpq` (any platform tag of the
/// same width), where `N` is a digit from 0 to 7.
pub fn extract_mpq_index(mpq_name: &str) -> Result<usize> {
    if is_lockdown(mpq_name) {
        return Err(Error::Lockdown(mpq_name.to_string()));
    }
    if mpq_name.len() < 7 {
        return Err(Error::range(format!("MPQ name '{}' is too short", mpq_name)));
    }

    let position = if mpq_name.to_ascii_uppercase().starts_with("VER") {
        9
    } else {
        7
    };

    let digit = mpq_name
        .as_bytes()
        .get(position)
        .copied()
        .ok_or_else(|| Error::range(format!("MPQ name '{}' has no index digit", mpq_name)))?;

    match digit {
        b'0'..=b'7' => Ok((digit - b'0') as usize),
        _ => Err(Error::range(format!(
            "MPQ name '{}' has invalid index '{}'",
            mpq_name, digit as char
        ))),
    }
}

/// Result of a Lockdown check, produced outside this crate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockdownResult {
    /// EXE version reported to the server
    pub version: i32,
    /// Checksum reported to the server
    pub checksum: i32,
    /// Digest reported in place of the EXE information
    pub digest: Vec<u8>,
}

/// Performs Lockdown revision checks for the products that require them
pub trait LockdownProvider {
    /// Run a Lockdown check for the given archive
    fn check(&self, value: &str, files: &[&Path], mpq_name: &str) -> Result<LockdownResult>;
}

/// Outcome of [`RevisionChecker::check_revision_with`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevisionResult {
    /// Classic value-string checksum
    Checksum(i32),
    /// Lockdown answer from the provider
    Lockdown(LockdownResult),
}

/// Revision check engine
///
/// Owns the formula cache and the file loader; safe to share between
/// threads, every call keeps its registers on its own stack.
#[derive(Debug)]
pub struct RevisionChecker {
    config: RevisionConfig,
    formulas: FormulaCache,
    loader: PaddedFileLoader,
}

impl Default for RevisionChecker {
    fn default() -> Self {
        Self::build(RevisionConfig::default())
    }
}

impl RevisionChecker {
    /// Create an engine from a configuration
    pub fn new(config: RevisionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: RevisionConfig) -> Self {
        RevisionChecker {
            formulas: FormulaCache::new(config.formula_cache_capacity),
            loader: PaddedFileLoader::new(config.strategy),
            config,
        }
    }

    /// The configuration in use
    pub fn config(&self) -> &RevisionConfig {
        &self.config
    }

    /// The formula cache
    pub fn formula_cache(&self) -> &FormulaCache {
        &self.formulas
    }

    /// The file loader
    pub fn loader(&self) -> &PaddedFileLoader {
        &self.loader
    }

    /// Compute the checksum of three files
    pub fn compute<P: AsRef<Path>>(
        &self,
        value: &str,
        files: &[P; FILE_COUNT],
        mpq_index: usize,
    ) -> Result<i32> {
        let hash_code = mpq_hash_code(mpq_index)?;
        log::debug!(
            "Computing checksum with MPQ index {} ({} strategy, {} execution)",
            mpq_index,
            self.config.strategy,
            self.config.execution
        );

        match self.config.execution {
            ExecutionMode::Interpreted => {
                let program = ValueProgram::parse(value)?;
                let mut pass = ChecksumPass::new(&program, hash_code);
                self.loader.run(files, &mut pass)?;
                Ok(pass.finish())
            }
            ExecutionMode::Compiled => {
                let program = self.formulas.get_or_compile(value)?;
                let mut pass = ChecksumPass::new(program.as_ref(), hash_code);
                self.loader.run(files, &mut pass)?;
                Ok(pass.finish())
            }
        }
    }

    /// Compute the checksum of data already in memory
    pub fn compute_loaded(
        &self,
        value: &str,
        data: &PaddedFileSet,
        mpq_index: usize,
    ) -> Result<i32> {
        let hash_code = mpq_hash_code(mpq_index)?;

        match self.config.execution {
            ExecutionMode::Interpreted => {
                let program = ValueProgram::parse(value)?;
                let mut pass = ChecksumPass::new(&program, hash_code);
                data.feed(&mut pass)?;
                Ok(pass.finish())
            }
            ExecutionMode::Compiled => {
                let program = self.formulas.get_or_compile(value)?;
                let mut pass = ChecksumPass::new(program.as_ref(), hash_code);
                data.feed(&mut pass)?;
                Ok(pass.finish())
            }
        }
    }

    /// Compute the checksum for the archive named by the server
    pub fn check_revision<P: AsRef<Path>>(
        &self,
        value: &str,
        files: &[P; FILE_COUNT],
        mpq_name: &str,
    ) -> Result<i32> {
        let index = extract_mpq_index(mpq_name)?;
        self.compute(value, files, index)
    }

    /// Like [`check_revision`](Self::check_revision), handing Lockdown
    /// archives to `lockdown`
    pub fn check_revision_with<P, L>(
        &self,
        value: &str,
        files: &[P; FILE_COUNT],
        mpq_name: &str,
        lockdown: &L,
    ) -> Result<RevisionResult>
    where
        P: AsRef<Path>,
        L: LockdownProvider + ?Sized,
    {
        if is_lockdown(mpq_name) {
            let paths: Vec<&Path> = files.iter().map(|p| p.as_ref()).collect();
            log::debug!("Delegating {} to the Lockdown provider", mpq_name);
            return lockdown
                .check(value, &paths, mpq_name)
                .map(RevisionResult::Lockdown);
        }

        self.check_revision(value, files, mpq_name)
            .map(RevisionResult::Checksum)
    }
}

static DEFAULT_CHECKER: Lazy<RevisionChecker> = Lazy::new(RevisionChecker::default);

/// Compute a revision check checksum with the default engine
pub fn compute_checksum<P: AsRef<Path>>(
    value: &str,
    files: &[P; FILE_COUNT],
    mpq_index: usize,
) -> Result<i32> {
    DEFAULT_CHECKER.compute(value, files, mpq_index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LoadStrategy;

    #[test]
    fn test_extract_mpq_index() {
        assert_eq!(extract_mpq_index("IX86ver0.mpq").unwrap(), 0);
        assert_eq!(extract_mpq_index("IX86ver7.mpq").unwrap(), 7);
        assert_eq!(extract_mpq_index("ver-IX86-3.mpq").unwrap(), 3);
        assert_eq!(extract_mpq_index("VER-XMAC-5.mpq").unwrap(), 5);
        assert_eq!(extract_mpq_index("PMACver2.mpq").unwrap(), 2);
    }

    #[test]
    fn test_extract_mpq_index_failures() {
        assert!(matches!(
            extract_mpq_index("lockdown-IX86-00.mpq"),
            Err(Error::Lockdown(_))
        ));
        assert!(matches!(
            extract_mpq_index("LOCKDOWN-IX86-12.mpq"),
            Err(Error::Lockdown(_))
        ));
        assert!(matches!(extract_mpq_index("ver.mp"), Err(Error::Range(_))));
        assert!(matches!(extract_mpq_index("IX86ver"), Err(Error::Range(_))));
        assert!(matches!(extract_mpq_index("IX86ver8.mpq"), Err(Error::Range(_))));
        assert!(matches!(extract_mpq_index("ver-IX86-x.mpq"), Err(Error::Range(_))));
    }

    #[test]
    fn test_mpq_hash_code_range() {
        assert_eq!(mpq_hash_code(0).unwrap(), 0xE7F4CB62);
        assert_eq!(mpq_hash_code(7).unwrap(), 0x2FEC8733);
        assert!(matches!(mpq_hash_code(8), Err(Error::Range(_))));
    }

    #[test]
    fn test_compute_loaded_golden() {
        let data = PaddedFileSet::from_raw([vec![0u8; 1024], vec![0u8; 1024], vec![0u8; 1024]]);
        let value = "A=746187 B=0 C=746187 4 A=A^S B=B^S C=C^A";

        for execution in [ExecutionMode::Interpreted, ExecutionMode::Compiled] {
            let checker =
                RevisionChecker::new(RevisionConfig::default().with_execution(execution)).unwrap();
            assert_eq!(checker.compute_loaded(value, &data, 3).unwrap(), 746187);
        }
    }

    #[test]
    fn test_compute_loaded_padded_golden() {
        let data = PaddedFileSet::from_raw([
            b"hello world".to_vec(),
            (0..=255u8).cycle().take(1280).collect::<Vec<u8>>(),
            Vec::new(),
        ]);
        let value = "A=3845581634 B=880823580 C=1363937103 4 A=A-S B=B-C C=C-A A=A+B";

        let checker = RevisionChecker::default();
        assert_eq!(checker.compute_loaded(value, &data, 0).unwrap(), -1344281678);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = RevisionConfig::default()
            .with_strategy(LoadStrategy::Preload)
            .with_formula_cache_capacity(0);
        assert!(matches!(RevisionChecker::new(config), Err(Error::Config(_))));
    }

    struct FixedLockdown;

    impl LockdownProvider for FixedLockdown {
        fn check(&self, _value: &str, files: &[&Path], mpq_name: &str) -> Result<LockdownResult> {
            assert_eq!(files.len(), 3);
            Ok(LockdownResult {
                version: 0x01010101,
                checksum: mpq_name.len() as i32,
                digest: vec![0xAB; 17],
            })
        }
    }

    #[test]
    fn test_lockdown_is_delegated() {
        let checker = RevisionChecker::default();
        let result = checker
            .check_revision_with(
                "anything",
                &["a.exe", "b.dll", "c.snp"],
                "lockdown-IX86-07.mpq",
                &FixedLockdown,
            )
            .unwrap();

        match result {
            RevisionResult::Lockdown(answer) => {
                assert_eq!(answer.checksum, 20);
                assert_eq!(answer.digest.len(), 17);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
