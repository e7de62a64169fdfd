//! ISO-639-2 language code normalization.
//!
//! Every probing tool reports languages a little differently: mkvmerge uses
//! ISO-639-2/B codes, ffprobe mostly 639-2 with the odd 639-1 code, and
//! mediainfo uses 639-1 codes or IETF tags such as `en-US`. All of them are
//! mapped onto the bibliographic (639-2/B) code here.

/// Code used for an absent or unresolvable language.
pub const UNDETERMINED: &str = "und";

/// `(639-1, 639-2/B, 639-2/T)` for every language with a two letter code.
const ISO639: &[(&str, &str, &str)] = &[
    ("aa", "aar", "aar"),
    ("ab", "abk", "abk"),
    ("ae", "ave", "ave"),
    ("af", "afr", "afr"),
    ("ak", "aka", "aka"),
    ("am", "amh", "amh"),
    ("an", "arg", "arg"),
    ("ar", "ara", "ara"),
    ("as", "asm", "asm"),
    ("av", "ava", "ava"),
    ("ay", "aym", "aym"),
    ("az", "aze", "aze"),
    ("ba", "bak", "bak"),
    ("be", "bel", "bel"),
    ("bg", "bul", "bul"),
    ("bh", "bih", "bih"),
    ("bi", "bis", "bis"),
    ("bm", "bam", "bam"),
    ("bn", "ben", "ben"),
    ("bo", "tib", "bod"),
    ("br", "bre", "bre"),
    ("bs", "bos", "bos"),
    ("ca", "cat", "cat"),
    ("ce", "che", "che"),
    ("ch", "cha", "cha"),
    ("co", "cos", "cos"),
    ("cr", "cre", "cre"),
    ("cs", "cze", "ces"),
    ("cu", "chu", "chu"),
    ("cv", "chv", "chv"),
    ("cy", "wel", "cym"),
    ("da", "dan", "dan"),
    ("de", "ger", "deu"),
    ("dv", "div", "div"),
    ("dz", "dzo", "dzo"),
    ("ee", "ewe", "ewe"),
    ("el", "gre", "ell"),
    ("en", "eng", "eng"),
    ("eo", "epo", "epo"),
    ("es", "spa", "spa"),
    ("et", "est", "est"),
    ("eu", "baq", "eus"),
    ("fa", "per", "fas"),
    ("ff", "ful", "ful"),
    ("fi", "fin", "fin"),
    ("fj", "fij", "fij"),
    ("fo", "fao", "fao"),
    ("fr", "fre", "fra"),
    ("fy", "fry", "fry"),
    ("ga", "gle", "gle"),
    ("gd", "gla", "gla"),
    ("gl", "glg", "glg"),
    ("gn", "grn", "grn"),
    ("gu", "guj", "guj"),
    ("gv", "glv", "glv"),
    ("ha", "hau", "hau"),
    ("he", "heb", "heb"),
    ("hi", "hin", "hin"),
    ("ho", "hmo", "hmo"),
    ("hr", "hrv", "hrv"),
    ("ht", "hat", "hat"),
    ("hu", "hun", "hun"),
    ("hy", "arm", "hye"),
    ("hz", "her", "her"),
    ("ia", "ina", "ina"),
    ("id", "ind", "ind"),
    ("ie", "ile", "ile"),
    ("ig", "ibo", "ibo"),
    ("ii", "iii", "iii"),
    ("ik", "ipk", "ipk"),
    ("io", "ido", "ido"),
    ("is", "ice", "isl"),
    ("it", "ita", "ita"),
    ("iu", "iku", "iku"),
    ("ja", "jpn", "jpn"),
    ("jv", "jav", "jav"),
    ("ka", "geo", "kat"),
    ("kg", "kon", "kon"),
    ("ki", "kik", "kik"),
    ("kj", "kua", "kua"),
    ("kk", "kaz", "kaz"),
    ("kl", "kal", "kal"),
    ("km", "khm", "khm"),
    ("kn", "kan", "kan"),
    ("ko", "kor", "kor"),
    ("kr", "kau", "kau"),
    ("ks", "kas", "kas"),
    ("ku", "kur", "kur"),
    ("kv", "kom", "kom"),
    ("kw", "cor", "cor"),
    ("ky", "kir", "kir"),
    ("la", "lat", "lat"),
    ("lb", "ltz", "ltz"),
    ("lg", "lug", "lug"),
    ("li", "lim", "lim"),
    ("ln", "lin", "lin"),
    ("lo", "lao", "lao"),
    ("lt", "lit", "lit"),
    ("lu", "lub", "lub"),
    ("lv", "lav", "lav"),
    ("mg", "mlg", "mlg"),
    ("mh", "mah", "mah"),
    ("mi", "mao", "mri"),
    ("mk", "mac", "mkd"),
    ("ml", "mal", "mal"),
    ("mn", "mon", "mon"),
    ("mr", "mar", "mar"),
    ("ms", "may", "msa"),
    ("mt", "mlt", "mlt"),
    ("my", "bur", "mya"),
    ("na", "nau", "nau"),
    ("nb", "nob", "nob"),
    ("nd", "nde", "nde"),
    ("ne", "nep", "nep"),
    ("ng", "ndo", "ndo"),
    ("nl", "dut", "nld"),
    ("nn", "nno", "nno"),
    ("no", "nor", "nor"),
    ("nr", "nbl", "nbl"),
    ("nv", "nav", "nav"),
    ("ny", "nya", "nya"),
    ("oc", "oci", "oci"),
    ("oj", "oji", "oji"),
    ("om", "orm", "orm"),
    ("or", "ori", "ori"),
    ("os", "oss", "oss"),
    ("pa", "pan", "pan"),
    ("pi", "pli", "pli"),
    ("pl", "pol", "pol"),
    ("ps", "pus", "pus"),
    ("pt", "por", "por"),
    ("qu", "que", "que"),
    ("rm", "roh", "roh"),
    ("rn", "run", "run"),
    ("ro", "rum", "ron"),
    ("ru", "rus", "rus"),
    ("rw", "kin", "kin"),
    ("sa", "san", "san"),
    ("sc", "srd", "srd"),
    ("sd", "snd", "snd"),
    ("se", "sme", "sme"),
    ("sg", "sag", "sag"),
    ("si", "sin", "sin"),
    ("sk", "slo", "slk"),
    ("sl", "slv", "slv"),
    ("sm", "smo", "smo"),
    ("sn", "sna", "sna"),
    ("so", "som", "som"),
    ("sq", "alb", "sqi"),
    ("sr", "srp", "srp"),
    ("ss", "ssw", "ssw"),
    ("st", "sot", "sot"),
    ("su", "sun", "sun"),
    ("sv", "swe", "swe"),
    ("sw", "swa", "swa"),
    ("ta", "tam", "tam"),
    ("te", "tel", "tel"),
    ("tg", "tgk", "tgk"),
    ("th", "tha", "tha"),
    ("ti", "tir", "tir"),
    ("tk", "tuk", "tuk"),
    ("tl", "tgl", "tgl"),
    ("tn", "tsn", "tsn"),
    ("to", "ton", "ton"),
    ("tr", "tur", "tur"),
    ("ts", "tso", "tso"),
    ("tt", "tat", "tat"),
    ("tw", "twi", "twi"),
    ("ty", "tah", "tah"),
    ("ug", "uig", "uig"),
    ("uk", "ukr", "ukr"),
    ("ur", "urd", "urd"),
    ("uz", "uzb", "uzb"),
    ("ve", "ven", "ven"),
    ("vi", "vie", "vie"),
    ("vo", "vol", "vol"),
    ("wa", "wln", "wln"),
    ("wo", "wol", "wol"),
    ("xh", "xho", "xho"),
    ("yi", "yid", "yid"),
    ("yo", "yor", "yor"),
    ("za", "zha", "zha"),
    ("zh", "chi", "zho"),
    ("zu", "zul", "zul"),
];

/// ISO-639-2 codes without a two letter equivalent, including the collective
/// and special codes (`mul`, `sgn`, `zxx`).
const ISO639_2_ONLY: &[&str] = &[
    "ace", "ach", "ada", "ady", "afa", "afh", "ain", "akk", "ale", "alg", "alt", "ang", "anp",
    "apa", "arc", "arn", "arp", "art", "arw", "ast", "ath", "aus", "awa", "bad", "bai", "bal",
    "ban", "bas", "bat", "bej", "bem", "ber", "bho", "bik", "bin", "bla", "bnt", "bra", "btk",
    "bua", "bug", "byn", "cad", "cai", "car", "cau", "ceb", "cel", "chb", "chg", "chk", "chm",
    "chn", "cho", "chp", "chr", "chy", "cmc", "cnr", "cop", "cpe", "cpf", "cpp", "crh", "crp",
    "csb", "cus", "dak", "dar", "day", "del", "den", "dgr", "din", "doi", "dra", "dsb", "dua",
    "dum", "dyu", "efi", "egy", "eka", "elx", "enm", "fan", "fat", "fil", "fiu", "fon", "frm",
    "fro", "frr", "frs", "fur", "gaa", "gay", "gba", "gem", "gez", "gil", "gmh", "goh", "gon",
    "gor", "got", "grb", "grc", "gsw", "gwi", "hai", "haw", "hil", "him", "hit", "hmn", "hsb",
    "hup", "iba", "ijo", "ilo", "inc", "ine", "inh", "ira", "iro", "jbo", "jpr", "jrb", "kaa",
    "kab", "kac", "kam", "kar", "kaw", "kbd", "kha", "khi", "kho", "kmb", "kok", "kos", "kpe",
    "krc", "krl", "kro", "kru", "kum", "kut", "lad", "lah", "lam", "lez", "lol", "loz", "lua",
    "lui", "lun", "luo", "lus", "mad", "mag", "mai", "mak", "man", "map", "mas", "mdf", "mdr",
    "men", "mga", "mic", "min", "mis", "mkh", "mnc", "mni", "mno", "moh", "mos", "mul", "mun",
    "mus", "mwl", "mwr", "myn", "myv", "nah", "nai", "nap", "nds", "new", "nia", "nic", "niu",
    "nog", "non", "nqo", "nso", "nub", "nwc", "nym", "nyn", "nyo", "nzi", "osa", "ota", "oto",
    "paa", "pag", "pal", "pam", "pap", "pau", "peo", "phi", "phn", "pon", "pra", "pro", "raj",
    "rap", "rar", "roa", "rom", "rup", "sad", "sah", "sai", "sal", "sam", "sas", "sat", "scn",
    "sco", "sel", "sem", "sga", "sgn", "shn", "sid", "sio", "sit", "sla", "sma", "smi", "smj",
    "smn", "sms", "snk", "sog", "son", "srn", "srr", "ssa", "suk", "sus", "sux", "syc", "syr",
    "tai", "tem", "ter", "tet", "tig", "tiv", "tkl", "tlh", "tli", "tmh", "tog", "tpi", "tsi",
    "tum", "tup", "tut", "tvl", "tyv", "udm", "uga", "umb", "und", "vai", "vot", "wak", "wal",
    "war", "was", "wen", "xal", "yao", "yap", "ypk", "zap", "zbl", "zen", "zgh", "znd", "zun",
    "zxx", "zza",
];

/// Look up a language tag and return its ISO-639-2/B code.
///
/// Accepts two letter codes, either three letter variant, and IETF style
/// tags (`pt-BR`, `zh-Hans`) which are resolved by their primary subtag.
/// The terminology alias `zho` resolves to `chi`, the code mkvmerge and
/// ffprobe use.
pub fn lookup(tag: &str) -> Option<&'static str> {
    let tag = tag.trim();
    let primary = tag.split(['-', '_']).next().unwrap_or(tag);
    let primary = primary.to_ascii_lowercase();

    match primary.len() {
        2 => ISO639
            .iter()
            .find(|(part1, _, _)| *part1 == primary)
            .map(|(_, part2b, _)| *part2b),
        3 => ISO639
            .iter()
            .find(|(_, part2b, part2t)| *part2b == primary || *part2t == primary)
            .map(|(_, part2b, _)| *part2b)
            .or_else(|| {
                ISO639_2_ONLY
                    .binary_search(&primary.as_str())
                    .ok()
                    .map(|i| ISO639_2_ONLY[i])
            }),
        _ => None,
    }
}

/// Normalize a raw language tag reported by a probing tool.
///
/// An absent or blank tag is [`UNDETERMINED`]. A tag that cannot be resolved
/// is returned as the error so the caller can flag the track.
pub fn normalize(raw: Option<&str>) -> std::result::Result<&'static str, &str> {
    match raw.map(str::trim) {
        None | Some("") => Ok(UNDETERMINED),
        Some(tag) => lookup(tag).ok_or(tag),
    }
}

/// Whether a normalized code means "no known language".
pub fn is_undetermined(code: &str) -> bool {
    code.is_empty() || code.eq_ignore_ascii_case(UNDETERMINED)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_variants() {
        let cases = [
            ("eng", Some("eng")),
            ("en", Some("eng")),
            ("EN", Some("eng")),
            ("en-US", Some("eng")),
            ("deu", Some("ger")),
            ("ger", Some("ger")),
            ("fra", Some("fre")),
            ("zho", Some("chi")),
            ("zh-CN", Some("chi")),
            ("chi", Some("chi")),
            ("und", Some("und")),
            ("haw", Some("haw")),
            ("ceb", Some("ceb")),
            ("HSB", Some("hsb")),
            ("sgn", Some("sgn")),
            ("smi", Some("smi")),
            ("nqo", Some("nqo")),
            ("zgh", Some("zgh")),
            ("qaa", None),
            ("???", None),
            ("null", None),
            ("xx", None),
            ("english", None),
        ];

        for (tag, expected) in cases {
            assert_eq!(lookup(tag), expected, "tag {tag:?}");
        }
    }

    #[test]
    fn test_tables_are_sorted_and_disjoint() {
        assert!(ISO639_2_ONLY.windows(2).all(|w| w[0] < w[1]));
        for (_, part2b, part2t) in ISO639 {
            assert!(ISO639_2_ONLY.binary_search(part2b).is_err(), "{part2b}");
            assert!(ISO639_2_ONLY.binary_search(part2t).is_err(), "{part2t}");
        }
    }

    #[test]
    fn test_normalize_empty_is_undetermined() {
        assert_eq!(normalize(None), Ok("und"));
        assert_eq!(normalize(Some("")), Ok("und"));
        assert_eq!(normalize(Some("  ")), Ok("und"));
    }

    #[test]
    fn test_normalize_unknown_returns_tag() {
        assert_eq!(normalize(Some("???")), Err("???"));
        assert_eq!(normalize(Some("spa")), Ok("spa"));
    }

    #[test]
    fn test_is_undetermined() {
        assert!(is_undetermined(""));
        assert!(is_undetermined("UND"));
        assert!(!is_undetermined("eng"));
    }
}
