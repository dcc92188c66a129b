//! Static character tables used by the permutation rules.

use phf::phf_map;

/// Static list of lowercase ASCII characters.
pub static ASCII_LOWER: [char; 26] = [
    'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's',
    't', 'u', 'v', 'w', 'x', 'y', 'z',
];

pub static VOWELS: [char; 5] = ['a', 'e', 'i', 'o', 'u'];

/// Confusable characters per ASCII letter/digit. Mixes ASCII lookalikes
/// (`l` vs `1`) with the most common Unicode confusables.
pub static HOMOGLYPHS: phf::Map<char, &'static str> = phf_map! {
    'a' => "àáâãäåɑа",
    'b' => "dƄЬ",
    'c' => "çćĉċсƈ",
    'd' => "bďđԁ",
    'e' => "èéêëēėеҽ",
    'f' => "ƒſ",
    'g' => "qɡցĝğ",
    'h' => "ĥħһ",
    'i' => "1lìíîïıі",
    'j' => "ĵј",
    'k' => "ķĸκ",
    'l' => "1iļľłӏ",
    'm' => "rnṁм",
    'n' => "ñńņйո",
    'o' => "0òóôõöоօ",
    'p' => "ṗр",
    'q' => "gɋԛ",
    'r' => "ŕŗгɾ",
    's' => "śŝşѕ",
    't' => "ţťṫт",
    'u' => "ùúûüսυ",
    'v' => "νѵ",
    'w' => "ŵшѡ",
    'x' => "хҳ",
    'y' => "ýÿуү",
    'z' => "źżžʐ",
    '0' => "o",
    '1' => "li",
};

/// QWERTY adjacency per key; the only layout the generator considers.
pub static QWERTY: phf::Map<char, &'static str> = phf_map! {
    '1' => "2q",
    '2' => "3wq1",
    '3' => "4ew2",
    '4' => "5re3",
    '5' => "6tr4",
    '6' => "7yt5",
    '7' => "8uy6",
    '8' => "9iu7",
    '9' => "0oi8",
    '0' => "po9",
    'q' => "w1a2",
    'w' => "3esaq2",
    'e' => "4rdsw3",
    'r' => "5tfde4",
    't' => "6ygfr5",
    'y' => "7uhgt6",
    'u' => "8ijhy7",
    'i' => "9okju8",
    'o' => "0plki9",
    'p' => "lo0",
    'a' => "qwsz",
    's' => "edxzaw",
    'd' => "rfcxse",
    'f' => "tgvcdr",
    'g' => "yhbvft",
    'h' => "ujnbgy",
    'j' => "ikmnhu",
    'k' => "olmji",
    'l' => "kop",
    'z' => "asx",
    'x' => "zsdc",
    'c' => "xdfv",
    'v' => "cfgb",
    'b' => "vghn",
    'n' => "bhjm",
    'm' => "njk",
};

/// Built-in TLD corpus used by the rule-based TLD replacement. Callers
/// can extend coverage with an explicit TLD list.
pub static COMMON_TLDS: [&str; 32] = [
    "com", "net", "org", "info", "biz", "co", "io", "me", "us", "uk", "ca", "de", "fr", "es", "it",
    "nl", "ru", "cn", "in", "br", "au", "jp", "xyz", "top", "site", "online", "club", "shop",
    "app", "dev", "live", "store",
];
