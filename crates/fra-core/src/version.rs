use std::cmp::Ordering;

/// A release version split into its dotted numeric core and the tokens of an
/// optional pre-release or patch-level suffix.
#[derive(Debug, Clone)]
struct ReleaseVersion<'a> {
    core: Vec<u64>,
    suffix: Vec<&'a str>,
}

impl<'a> ReleaseVersion<'a> {
    fn parse(raw: &'a str) -> Self {
        let trimmed = raw.trim();
        let trimmed = trimmed.strip_prefix(['v', 'V']).unwrap_or(trimmed);
        let without_build = trimmed.split_once('+').map_or(trimmed, |(head, _)| head);

        let core_end = without_build
            .find(|ch: char| !ch.is_ascii_digit() && ch != '.')
            .unwrap_or(without_build.len());
        let (core_text, rest) = without_build.split_at(core_end);

        let core = core_text
            .trim_end_matches('.')
            .split('.')
            .map(parse_number)
            .collect();

        Self {
            core,
            suffix: suffix_tokens(rest),
        }
    }
}

/// Digit runs too long for `u64` saturate instead of collapsing to zero.
fn parse_number(digits: &str) -> u64 {
    if digits.is_empty() {
        return 0;
    }
    digits.parse().unwrap_or(u64::MAX)
}

/// Split a suffix such as `-RC1` or `beta.2` into `["RC", "1"]` or
/// `["beta", "2"]`: separators break tokens, and so does every switch
/// between digits and letters.
fn suffix_tokens(suffix: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = None;
    let mut prev_digit = false;

    for (idx, ch) in suffix.char_indices() {
        if matches!(ch, '.' | '-' | '_' | '+') {
            if let Some(begin) = start.take() {
                tokens.push(&suffix[begin..idx]);
            }
            continue;
        }
        let digit = ch.is_ascii_digit();
        match start {
            Some(begin) if digit != prev_digit => {
                tokens.push(&suffix[begin..idx]);
                start = Some(idx);
            }
            Some(_) => {}
            None => start = Some(idx),
        }
        prev_digit = digit;
    }
    if let Some(begin) = start {
        tokens.push(&suffix[begin..]);
    }
    tokens
}

const NUMBER_RANK: u8 = 5;

/// Rank of a suffix token: `dev < alpha < beta < RC < number < pl`, with
/// unrecognised words below all of them.
fn token_rank(token: &str) -> u8 {
    if token.bytes().all(|b| b.is_ascii_digit()) {
        return NUMBER_RANK;
    }
    match token.to_ascii_lowercase().as_str() {
        "dev" => 1,
        "alpha" | "a" => 2,
        "beta" | "b" => 3,
        "rc" => 4,
        "pl" | "p" => 6,
        _ => 0,
    }
}

fn compare_tokens(left: &str, right: &str) -> Ordering {
    let (left_rank, right_rank) = (token_rank(left), token_rank(right));
    if left_rank != right_rank {
        return left_rank.cmp(&right_rank);
    }
    match left_rank {
        NUMBER_RANK => parse_number(left).cmp(&parse_number(right)),
        0 => left.to_ascii_lowercase().cmp(&right.to_ascii_lowercase()),
        _ => Ordering::Equal,
    }
}

/// A missing token sits where a number would: more digits make a version
/// newer, `1.0` beats `1.0-beta` and `1.0pl1` beats `1.0`.
fn compare_missing(present: &str) -> Ordering {
    if token_rank(present) == NUMBER_RANK {
        Ordering::Less
    } else {
        NUMBER_RANK.cmp(&token_rank(present))
    }
}

impl Ord for ReleaseVersion<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.core.len().max(other.core.len());
        for idx in 0..len {
            let left = self.core.get(idx).copied().unwrap_or(0);
            let right = other.core.get(idx).copied().unwrap_or(0);
            match left.cmp(&right) {
                Ordering::Equal => {}
                unequal => return unequal,
            }
        }

        let len = self.suffix.len().max(other.suffix.len());
        for idx in 0..len {
            let order = match (self.suffix.get(idx), other.suffix.get(idx)) {
                (Some(left), Some(right)) => compare_tokens(left, right),
                (None, Some(right)) => compare_missing(right),
                (Some(left), None) => compare_missing(left).reverse(),
                (None, None) => Ordering::Equal,
            };
            if order != Ordering::Equal {
                return order;
            }
        }
        Ordering::Equal
    }
}

impl PartialEq for ReleaseVersion<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ReleaseVersion<'_> {}

impl PartialOrd for ReleaseVersion<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Compare two dotted version strings.
///
/// Numeric components are compared numerically with missing trailing
/// components treated as `0`. Suffix words rank
/// `dev < alpha < beta < RC < number < pl`, case-insensitively, so a bare
/// release sits above its pre-releases. Build metadata after `+` is ignored.
#[must_use]
pub fn compare_versions(left: &str, right: &str) -> Ordering {
    ReleaseVersion::parse(left).cmp(&ReleaseVersion::parse(right))
}

#[must_use]
pub fn is_newer_version(latest: &str, current: &str) -> bool {
    compare_versions(latest, current) == Ordering::Greater
}

/// Strip a single leading `v` from a release tag.
#[must_use]
pub fn version_from_tag(tag: &str) -> &str {
    tag.strip_prefix('v').unwrap_or(tag)
}
