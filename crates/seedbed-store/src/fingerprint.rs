use seedbed_core::ids::Fingerprint;
use seedbed_core::types::Manifest;
use sha2::{Digest, Sha256};

/// Fingerprint a file manifest.
///
/// Canonicalization: backslashes become slashes, each entry renders as
/// `"{path} {size}"`, entries are sorted, joined with NUL, and hashed with
/// SHA-256 (lowercase hex). Equal (path, size) sets fingerprint equally
/// regardless of order or separator convention.
pub fn fingerprint(manifest: &Manifest) -> Fingerprint {
    let mut rendered: Vec<String> = manifest
        .entries()
        .iter()
        .map(|e| format!("{} {}", e.path.replace('\\', "/"), e.size))
        .collect();
    rendered.sort_unstable();

    let mut hasher = Sha256::new();
    for (i, line) in rendered.iter().enumerate() {
        if i > 0 {
            hasher.update([0u8]);
        }
        hasher.update(line.as_bytes());
    }
    let digest = hasher.finalize();
    let mut hex = String::with_capacity(64);
    for byte in digest {
        use std::fmt::Write;
        let _ = write!(hex, "{byte:02x}");
    }
    Fingerprint::new(hex)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(entries: &[(&str, u64)]) -> Manifest {
        Manifest::new(
            entries
                .iter()
                .map(|&(p, s)| Manifest::entry(p, s))
                .collect::<Vec<_>>(),
        )
    }

    #[test]
    fn order_does_not_matter() {
        let a = fingerprint(&manifest(&[("a/x.mkv", 100), ("a/y.nfo", 5)]));
        let b = fingerprint(&manifest(&[("a/y.nfo", 5), ("a/x.mkv", 100)]));
        assert_eq!(a, b);
    }

    #[test]
    fn separator_convention_does_not_matter() {
        let unix = fingerprint(&manifest(&[("a/x.mkv", 100)]));
        let windows = fingerprint(&manifest(&[("a\\x.mkv", 100)]));
        assert_eq!(unix, windows);
    }

    #[test]
    fn size_change_changes_fingerprint() {
        let a = fingerprint(&manifest(&[("a/x.mkv", 100)]));
        let b = fingerprint(&manifest(&[("a/x.mkv", 101)]));
        assert_ne!(a, b);
    }

    #[test]
    fn path_change_changes_fingerprint() {
        let a = fingerprint(&manifest(&[("a/x.mkv", 100)]));
        let b = fingerprint(&manifest(&[("a/z.mkv", 100)]));
        assert_ne!(a, b);
    }

    #[test]
    fn stable_byte_format() {
        // Pinned: sha256("a/x.mkv 100" + NUL + "b/y.nfo 5").
        let fp = fingerprint(&manifest(&[("b/y.nfo", 5), ("a\\x.mkv", 100)]));
        assert_eq!(fp.as_str().len(), 64);
        assert!(fp.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(
            fp,
            fingerprint(&manifest(&[("a/x.mkv", 100), ("b/y.nfo", 5)]))
        );
    }

    #[test]
    fn empty_manifest_hashes_empty_input() {
        let fp = fingerprint(&Manifest::default());
        // sha256 of no input
        assert_eq!(
            fp.as_str(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
