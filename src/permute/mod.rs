//! Domain permutation generation.
//!
//! Turns one seed domain into an ordered, deduplicated set of candidate
//! variants, each tagged with the mutation rule that produced it. The
//! rule battery is layered with a brute-force two-letter sweep, an
//! optional caller-supplied TLD expansion, and a final `www.` prefix
//! pass, trading candidate-set size for recall.
//!
//! Generation is pure string manipulation and never fails; a malformed
//! seed produces a degenerate but non-crashing candidate set.

mod tables;

use crate::types::Candidate;
use itertools::Itertools;
use tables::{ASCII_LOWER, COMMON_TLDS, HOMOGLYPHS, QWERTY, VOWELS};

/// Fuzzer tag carried by the seed record itself.
pub const ORIGINAL_TAG: &str = "*original";

/// Permutation generator for a single seed domain.
pub struct Generator {
    fqdn: String,
    /// First label of the seed (e.g. `example`).
    label: String,
    /// Everything after the first label (e.g. `com`); empty for
    /// degenerate seeds without a dot.
    tld: String,
    dictionary: Vec<String>,
    tld_list: Vec<String>,
}

impl Generator {
    pub fn new(seed: &str, dictionary: Vec<String>, tld_list: Vec<String>) -> Self {
        let fqdn = seed.trim().trim_end_matches('.').to_lowercase();
        let (label, tld) = match fqdn.split_once('.') {
            Some((label, tld)) => (label.to_string(), tld.to_string()),
            None => (fqdn.clone(), String::new()),
        };

        Self {
            fqdn,
            label,
            tld,
            dictionary,
            tld_list,
        }
    }

    /// The normalized seed domain.
    pub fn seed(&self) -> &str {
        &self.fqdn
    }

    /// Run the full battery and return the finalized candidate set:
    /// seed first, deduplicated, insertion order preserved.
    pub fn generate(&self) -> Vec<Candidate> {
        let mut raw: Vec<Candidate> = vec![Candidate::new(ORIGINAL_TAG, &self.fqdn)];

        let rules: [(&str, Vec<String>); 12] = [
            ("addition", self.addition().collect()),
            ("omission", self.omission().collect()),
            ("repetition", self.repetition().collect()),
            ("transposition", self.transposition().collect()),
            ("replacement", self.replacement().collect()),
            ("insertion", self.insertion().collect()),
            ("vowel-swap", self.vowel_swap().collect()),
            ("bitsquatting", self.bitsquatting().collect()),
            ("homoglyph", self.homoglyph().collect()),
            ("hyphenation", self.hyphenation().collect()),
            ("subdomain", self.subdomain().collect()),
            ("dictionary", self.dictionary_words().collect()),
        ];

        for (tag, domains) in rules {
            raw.extend(domains.into_iter().map(|d| Candidate::new(tag, d)));
        }

        // Built-in TLD corpus replacement.
        raw.extend(self.tld_corpus().map(|d| Candidate::new("tld-swap", d)));

        // Brute-force supplement on top of the rule output: every
        // two-letter pair injected at the final label boundary.
        raw.extend(
            self.addition_sweep()
                .map(|d| Candidate::new("addition", d)),
        );

        // Caller-supplied TLD expansion runs over everything generated
        // so far, after the primary pass and before dedup.
        if !self.tld_list.is_empty() {
            let snapshot: Vec<String> = raw.iter().map(|c| c.domain.clone()).collect();
            for domain in &snapshot {
                if let Some((stem, _)) = domain.rsplit_once('.') {
                    for tld in &self.tld_list {
                        raw.push(Candidate::new("tld-swap", format!("{stem}.{tld}")));
                    }
                }
            }
        }

        // Final pass: www. prefix on every candidate so far.
        let snapshot: Vec<String> = raw.iter().map(|c| c.domain.clone()).collect();
        for domain in snapshot {
            if !domain.starts_with("www.") {
                raw.push(Candidate::new("www-prefix", format!("www.{domain}")));
            }
        }

        self.finalize(raw)
    }

    /// Validate and deduplicate a raw candidate list. Public so callers
    /// layering their own expansions can run the same post-processing.
    ///
    /// Keeps the seed as element 0, drops invalid names and duplicates
    /// of the seed, and dedups case-insensitively by domain while
    /// preserving first-seen tag and insertion order.
    pub fn finalize(&self, raw: Vec<Candidate>) -> Vec<Candidate> {
        let mut seen = std::collections::HashSet::new();
        seen.insert(self.fqdn.clone());

        let mut out = vec![Candidate::new(ORIGINAL_TAG, &self.fqdn)];
        for candidate in raw {
            let key = candidate.domain.to_lowercase();
            if key == self.fqdn || !is_valid_domain(&key) {
                continue;
            }
            if seen.insert(key.clone()) {
                out.push(Candidate::new(candidate.fuzzer, key));
            }
        }

        out
    }

    /// Append every single lowercase letter to the seed label.
    fn addition(&self) -> impl Iterator<Item = String> + '_ {
        ASCII_LOWER
            .iter()
            .map(move |c| self.join(&format!("{}{}", self.label, c)))
    }

    /// Exhaustive two-letter sweep at the final label boundary: 676
    /// combinations per seed.
    fn addition_sweep(&self) -> impl Iterator<Item = String> + '_ {
        ASCII_LOWER
            .iter()
            .cartesian_product(ASCII_LOWER.iter())
            .map(move |(a, b)| self.join(&format!("{}{}{}", self.label, a, b)))
    }

    /// Remove one character at a time.
    fn omission(&self) -> impl Iterator<Item = String> + '_ {
        let chars: Vec<char> = self.fqdn.chars().collect();
        (0..chars.len()).map(move |i| {
            let mut permutation = chars.clone();
            permutation.remove(i);
            permutation.into_iter().collect()
        })
    }

    /// Double each alphabetic character.
    fn repetition(&self) -> impl Iterator<Item = String> + '_ {
        let chars: Vec<char> = self.fqdn.chars().collect();
        (0..chars.len()).filter_map(move |i| {
            if chars[i].is_alphabetic() {
                let mut permutation = chars.clone();
                permutation.insert(i, chars[i]);
                Some(permutation.into_iter().collect())
            } else {
                None
            }
        })
    }

    /// Swap each pair of adjacent, unequal characters.
    fn transposition(&self) -> impl Iterator<Item = String> + '_ {
        let chars: Vec<char> = self.fqdn.chars().collect();
        (0..chars.len().saturating_sub(1)).filter_map(move |i| {
            if chars[i] == chars[i + 1] {
                None
            } else {
                let mut permutation = chars.clone();
                permutation.swap(i, i + 1);
                Some(permutation.into_iter().collect())
            }
        })
    }

    /// Replace each inner character with its QWERTY neighbors.
    fn replacement(&self) -> impl Iterator<Item = String> + '_ {
        let chars: Vec<char> = self.fqdn.chars().collect();
        let len = chars.len();
        (1..len.saturating_sub(1))
            .flat_map(move |i| {
                let chars = chars.clone();
                QWERTY
                    .get(&chars[i])
                    .into_iter()
                    .flat_map(|n| n.chars())
                    .map(move |neighbor| {
                        let mut permutation = chars.clone();
                        permutation[i] = neighbor;
                        permutation.iter().collect::<String>()
                    })
                    .collect::<Vec<_>>()
            })
    }

    /// Insert QWERTY neighbors of each inner character next to it,
    /// modeling a fat-finger double press.
    fn insertion(&self) -> impl Iterator<Item = String> + '_ {
        let chars: Vec<char> = self.fqdn.chars().collect();
        let len = chars.len();
        (1..len.saturating_sub(1))
            .flat_map(move |i| {
                let chars = chars.clone();
                QWERTY
                    .get(&chars[i])
                    .into_iter()
                    .flat_map(|n| n.chars())
                    .map(move |neighbor| {
                        let mut permutation = chars.clone();
                        permutation.insert(i, neighbor);
                        permutation.iter().collect::<String>()
                    })
                    .collect::<Vec<_>>()
            })
    }

    /// Swap each vowel for every other vowel.
    fn vowel_swap(&self) -> impl Iterator<Item = String> + '_ {
        let chars: Vec<char> = self.fqdn.chars().collect();
        (0..chars.len()).flat_map(move |i| {
            let chars = chars.clone();
            let current = chars[i];
            if !VOWELS.contains(&current) {
                return Vec::new();
            }
            VOWELS
                .iter()
                .filter(move |&&v| v != current)
                .map(move |&v| {
                    let mut permutation = chars.clone();
                    permutation[i] = v;
                    permutation.iter().collect::<String>()
                })
                .collect::<Vec<_>>()
        })
    }

    /// Flip each of the 8 bits of every character, keeping only results
    /// that remain valid hostname characters.
    fn bitsquatting(&self) -> impl Iterator<Item = String> + '_ {
        let chars: Vec<char> = self.fqdn.chars().collect();
        (0..chars.len()).flat_map(move |i| {
            let chars = chars.clone();
            // Bit flips are only meaningful on single-byte characters.
            if !chars[i].is_ascii() {
                return Vec::new();
            }
            (0..8u8)
                .filter_map(move |mask_index| {
                    let flipped = (1u8 << mask_index) ^ (chars[i] as u8);
                    if flipped.is_ascii_lowercase()
                        || flipped.is_ascii_digit()
                        || flipped == b'-'
                    {
                        let mut permutation = chars.clone();
                        permutation[i] = flipped as char;
                        Some(permutation.iter().collect::<String>())
                    } else {
                        None
                    }
                })
                .collect::<Vec<_>>()
        })
    }

    /// Substitute each character with its confusable lookalikes, one
    /// position at a time.
    fn homoglyph(&self) -> impl Iterator<Item = String> + '_ {
        let chars: Vec<char> = self.fqdn.chars().collect();
        (0..chars.len()).flat_map(move |i| {
            let chars = chars.clone();
            HOMOGLYPHS
                .get(&chars[i])
                .into_iter()
                .flat_map(|glyphs| glyphs.chars())
                .map(move |glyph| {
                    let mut permutation = chars.clone();
                    permutation[i] = glyph;
                    permutation.iter().collect::<String>()
                })
                .collect::<Vec<_>>()
        })
    }

    /// Insert a hyphen between each pair of characters.
    fn hyphenation(&self) -> impl Iterator<Item = String> + '_ {
        let chars: Vec<char> = self.fqdn.chars().collect();
        (1..chars.len()).map(move |i| {
            let mut permutation = chars.clone();
            permutation.insert(i, '-');
            permutation.into_iter().collect()
        })
    }

    /// Turn a character boundary into a subdomain split (e.g.
    /// `example.com` -> `e.xample.com`).
    fn subdomain(&self) -> impl Iterator<Item = String> + '_ {
        let chars: Vec<char> = self.fqdn.chars().collect();
        (1..chars.len().saturating_sub(2)).filter_map(move |i| {
            if ['-', '.'].contains(&chars[i]) || ['-', '.'].contains(&chars[i - 1]) {
                None
            } else {
                let mut permutation = chars.clone();
                permutation.insert(i, '.');
                Some(permutation.into_iter().collect())
            }
        })
    }

    /// Combine the seed label with each dictionary word, prefixed and
    /// appended, with and without a hyphen.
    fn dictionary_words(&self) -> impl Iterator<Item = String> + '_ {
        self.dictionary.iter().flat_map(move |word| {
            [
                self.join(&format!("{}-{}", word, self.label)),
                self.join(&format!("{}{}", word, self.label)),
                self.join(&format!("{}-{}", self.label, word)),
                self.join(&format!("{}{}", self.label, word)),
            ]
        })
    }

    /// Replace the seed TLD with each entry of the built-in corpus.
    fn tld_corpus(&self) -> impl Iterator<Item = String> + '_ {
        COMMON_TLDS
            .iter()
            .map(move |tld| format!("{}.{}", self.label, tld))
    }

    fn join(&self, label: &str) -> String {
        if self.tld.is_empty() {
            label.to_string()
        } else {
            format!("{}.{}", label, self.tld)
        }
    }
}

/// Hostname validity check applied during finalize. Accepts Unicode
/// letters so homoglyph variants survive; rejects structurally broken
/// names (empty labels, leading/trailing hyphens, oversized labels).
pub fn is_valid_domain(domain: &str) -> bool {
    let char_count = domain.chars().count();
    if !(4..=253).contains(&char_count) || !domain.contains('.') {
        return false;
    }

    let labels: Vec<&str> = domain.split('.').collect();
    for label in &labels {
        let len = label.chars().count();
        if len == 0 || len > 63 || label.starts_with('-') || label.ends_with('-') {
            return false;
        }
        if !label
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || (c.is_alphabetic() && !c.is_ascii()))
        {
            return false;
        }
    }

    // The final label must look like a TLD.
    let tld = labels[labels.len() - 1];
    tld.chars().count() >= 2 && tld.chars().all(char::is_alphabetic)
}
