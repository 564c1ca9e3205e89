//! Closed word lists backing the detector battery
//!
//! These tables cover the high-frequency vocabulary of A1-B1 learner
//! speech. Unknown surface forms simply produce no correction, so the
//! lists trade recall for zero false positives on words they do know.

use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};

/// Grammatical gender of a noun (plural nouns are not tracked).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gender {
    Masc,
    /// Masculine taking the soft article (-я / -ят).
    MascSoft,
    Fem,
    Neut,
}

/// Person-number slot: 1sg, 2sg, 3sg, 1pl, 2pl, 3pl.
pub type Person = usize;

/// Bare noun -> gender.
pub static NOUN_GENDERS: Lazy<HashMap<&'static str, Gender>> = Lazy::new(|| {
    use Gender::*;
    HashMap::from([
        ("кафе", Neut),
        ("мляко", Neut),
        ("сирене", Neut),
        ("писмо", Neut),
        ("море", Neut),
        ("дете", Neut),
        ("кино", Neut),
        ("такси", Neut),
        ("легло", Neut),
        ("село", Neut),
        ("лято", Neut),
        ("вино", Neut),
        ("меню", Neut),
        ("маса", Fem),
        ("книга", Fem),
        ("вода", Fem),
        ("стая", Fem),
        ("къща", Fem),
        ("работа", Fem),
        ("гара", Fem),
        ("банка", Fem),
        ("улица", Fem),
        ("планина", Fem),
        ("програма", Fem),
        ("сметка", Fem),
        ("чанта", Fem),
        ("врата", Fem),
        ("салата", Fem),
        ("супа", Fem),
        ("закуска", Fem),
        ("вечеря", Fem),
        ("аптека", Fem),
        ("болница", Fem),
        ("библиотека", Fem),
        ("спирка", Fem),
        ("стол", Masc),
        ("град", Masc),
        ("магазин", Masc),
        ("ресторант", Masc),
        ("университет", Masc),
        ("автобус", Masc),
        ("влак", Masc),
        ("хляб", Masc),
        ("билет", Masc),
        ("парк", Masc),
        ("театър", Masc),
        ("хотел", Masc),
        ("телефон", Masc),
        ("компютър", Masc),
        ("език", Masc),
        ("урок", Masc),
        ("пазар", Masc),
        ("салон", Masc),
        ("офис", Masc),
        ("самолет", Masc),
        ("прозорец", Masc),
        ("ключ", Masc),
        ("чай", MascSoft),
        ("музей", MascSoft),
        ("учител", MascSoft),
        ("лекар", MascSoft),
        ("ден", MascSoft),
        ("приятел", MascSoft),
    ])
});

/// Prepositions whose bare-noun object usually requires the article.
pub static PREPOSITIONS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    HashSet::from(["в", "във", "до", "от", "с", "със", "при", "край", "зад", "пред"])
});

/// Nouns idiomatically bare after a preposition (на работа, на училище).
pub static BARE_AFTER_PREPOSITION: Lazy<HashSet<&'static str>> =
    Lazy::new(|| HashSet::from(["работа", "училище"]));

/// Copula forms that mark the preceding bare noun as a subject.
pub static COPULAE: Lazy<HashSet<&'static str>> =
    Lazy::new(|| HashSet::from(["е", "са", "беше", "бяха"]));

/// Attach the postposed definite article to a known noun.
///
/// Masculine takes the full form (-ът/-ят) in subject position and the
/// short form (-а/-я) elsewhere; feminine/neuter/soft endings do not
/// vary by position.
pub fn definite(noun: &str, gender: Gender, subject: bool) -> String {
    match gender {
        Gender::Fem => format!("{noun}та"),
        Gender::Neut => format!("{noun}то"),
        Gender::Masc => {
            if subject {
                format!("{noun}ът")
            } else {
                format!("{noun}а")
            }
        }
        Gender::MascSoft => {
            let stem = noun.strip_suffix('й').unwrap_or(noun);
            if subject {
                format!("{stem}ят")
            } else {
                format!("{stem}я")
            }
        }
    }
}

/// Modal verbs that require да + present: form -> person slot.
/// `трябва` is impersonal and matches any subject.
pub static MODALS: Lazy<HashMap<&'static str, Person>> = Lazy::new(|| {
    let mut m = HashMap::new();
    for (forms, persons) in [
        (
            ["искам", "искаш", "иска", "искаме", "искате", "искат"],
            [0, 1, 2, 3, 4, 5],
        ),
        (
            ["мога", "можеш", "може", "можем", "можете", "могат"],
            [0, 1, 2, 3, 4, 5],
        ),
        (
            [
                "започвам",
                "започваш",
                "започва",
                "започваме",
                "започвате",
                "започват",
            ],
            [0, 1, 2, 3, 4, 5],
        ),
        (
            ["спирам", "спираш", "спира", "спираме", "спирате", "спират"],
            [0, 1, 2, 3, 4, 5],
        ),
    ] {
        for (form, person) in forms.into_iter().zip(persons) {
            m.insert(form, person);
        }
    }
    m.insert("трябва", 2);
    m
});

/// Present-tense paradigms of common learner verbs:
/// [1sg, 2sg, 3sg, 1pl, 2pl, 3pl].
pub static VERB_TABLE: &[[&str; 6]] = &[
    ["искам", "искаш", "иска", "искаме", "искате", "искат"],
    ["поръчвам", "поръчваш", "поръчва", "поръчваме", "поръчвате", "поръчват"],
    ["поръчам", "поръчаш", "поръча", "поръчаме", "поръчате", "поръчат"],
    ["купувам", "купуваш", "купува", "купуваме", "купувате", "купуват"],
    ["купя", "купиш", "купи", "купим", "купите", "купят"],
    ["казвам", "казваш", "казва", "казваме", "казвате", "казват"],
    ["кажа", "кажеш", "каже", "кажем", "кажете", "кажат"],
    ["ходя", "ходиш", "ходи", "ходим", "ходите", "ходят"],
    ["отида", "отидеш", "отиде", "отидем", "отидете", "отидат"],
    ["отивам", "отиваш", "отива", "отиваме", "отивате", "отиват"],
    ["говоря", "говориш", "говори", "говорим", "говорите", "говорят"],
    ["работя", "работиш", "работи", "работим", "работите", "работят"],
    ["живея", "живееш", "живее", "живеем", "живеете", "живеят"],
    ["пия", "пиеш", "пие", "пием", "пиете", "пият"],
    ["уча", "учиш", "учи", "учим", "учите", "учат"],
    ["правя", "правиш", "прави", "правим", "правите", "правят"],
    ["гледам", "гледаш", "гледа", "гледаме", "гледате", "гледат"],
    ["слушам", "слушаш", "слуша", "слушаме", "слушате", "слушат"],
    ["пътувам", "пътуваш", "пътува", "пътуваме", "пътувате", "пътуват"],
    ["чета", "четеш", "чете", "четем", "четете", "четат"],
    ["пиша", "пишеш", "пише", "пишем", "пишете", "пишат"],
    ["помогна", "помогнеш", "помогне", "помогнем", "помогнете", "помогнат"],
    ["помагам", "помагаш", "помага", "помагаме", "помагате", "помагат"],
    ["плащам", "плащаш", "плаща", "плащаме", "плащате", "плащат"],
    ["платя", "платиш", "плати", "платим", "платите", "платят"],
    ["виждам", "виждаш", "вижда", "виждаме", "виждате", "виждат"],
    ["видя", "видиш", "види", "видим", "видите", "видят"],
    ["идвам", "идваш", "идва", "идваме", "идвате", "идват"],
    ["дойда", "дойдеш", "дойде", "дойдем", "дойдете", "дойдат"],
    ["взимам", "взимаш", "взима", "взимаме", "взимате", "взимат"],
    ["взема", "вземеш", "вземе", "вземем", "вземете", "вземат"],
    ["питам", "питаш", "пита", "питаме", "питате", "питат"],
    ["чакам", "чакаш", "чака", "чакаме", "чакате", "чакат"],
    ["търся", "търсиш", "търси", "търсим", "търсите", "търсят"],
    ["мисля", "мислиш", "мисли", "мислим", "мислите", "мислят"],
    ["обичам", "обичаш", "обича", "обичаме", "обичате", "обичат"],
    ["разбирам", "разбираш", "разбира", "разбираме", "разбирате", "разбират"],
    ["разбера", "разбереш", "разбере", "разберем", "разберете", "разберат"],
    ["почивам", "почиваш", "почива", "почиваме", "почивате", "почиват"],
];

/// Inflected verb form -> (row in `VERB_TABLE`, person slot).
pub static VERB_FORMS: Lazy<HashMap<&'static str, (usize, Person)>> = Lazy::new(|| {
    let mut m = HashMap::new();
    for (row, forms) in VERB_TABLE.iter().enumerate() {
        for (person, form) in forms.iter().enumerate() {
            // First paradigm wins for homographs (e.g. 3sg forms).
            m.entry(*form).or_insert((row, person));
        }
    }
    m
});

/// Imperfective -> perfective pairs for the да-construction, keyed per
/// inflected form where the generic -в- drop does not apply.
pub static PERFECTIVE_IRREGULAR: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("купувам", "купя"),
        ("купуваш", "купиш"),
        ("купува", "купи"),
        ("купуваме", "купим"),
        ("купувате", "купите"),
        ("купуват", "купят"),
        ("казвам", "кажа"),
        ("казваш", "кажеш"),
        ("казва", "каже"),
        ("казваме", "кажем"),
        ("казвате", "кажете"),
        ("казват", "кажат"),
        ("отивам", "отида"),
        ("отиваш", "отидеш"),
        ("отива", "отиде"),
        ("отиваме", "отидем"),
        ("отивате", "отидете"),
        ("отиват", "отидат"),
        ("помагам", "помогна"),
        ("помагаш", "помогнеш"),
        ("помага", "помогне"),
        ("помагаме", "помогнем"),
        ("помагате", "помогнете"),
        ("помагат", "помогнат"),
        ("плащам", "платя"),
        ("плащаш", "платиш"),
        ("плаща", "плати"),
        ("плащаме", "платим"),
        ("плащате", "платите"),
        ("плащат", "платят"),
        ("виждам", "видя"),
        ("виждаш", "видиш"),
        ("вижда", "види"),
        ("виждаме", "видим"),
        ("виждате", "видите"),
        ("виждат", "видят"),
        ("идвам", "дойда"),
        ("идваш", "дойдеш"),
        ("идва", "дойде"),
        ("идваме", "дойдем"),
        ("идвате", "дойдете"),
        ("идват", "дойдат"),
        ("почивам", "почина"),
        ("почиваш", "починеш"),
        ("почива", "почине"),
        ("почиваме", "починем"),
        ("почивате", "починете"),
        ("почиват", "починат"),
    ])
});

const PRESENT_ENDINGS: [&str; 10] = ["аме", "ате", "ите", "ете", "ам", "аш", "еш", "иш", "им", "ем"];

/// Map an imperfective present form onto its perfective counterpart for
/// use after да. Falls back to the -в- drop (поръчвам -> поръчам) and
/// finally to the unchanged form, which is itself grammatical after да.
pub fn perfectivize(form: &str) -> String {
    if let Some(perfective) = PERFECTIVE_IRREGULAR.get(form) {
        return (*perfective).to_string();
    }
    // -увам verbs keep their form after да (да пътувам).
    if ["увам", "уваш", "ува", "уваме", "увате", "уват"]
        .iter()
        .any(|e| form.ends_with(e))
    {
        return form.to_string();
    }
    for ending in ["ваме", "вате", "вам", "ваш", "ват", "ва"] {
        if let Some(stem) = form.strip_suffix(ending) {
            if !stem.is_empty() {
                return format!("{stem}{}", &ending[2..]);
            }
        }
    }
    form.to_string()
}

/// True when the token looks like a present-tense verb: either a known
/// paradigm form or an unambiguous present ending on a Cyrillic word.
pub fn is_present_verb(token: &str) -> bool {
    if VERB_FORMS.contains_key(token) {
        return true;
    }
    if MODALS.contains_key(token) {
        return false;
    }
    if NOUN_GENDERS.contains_key(token) || token.chars().any(|c| !c.is_alphabetic()) {
        return false;
    }
    token.chars().count() >= 4 && PRESENT_ENDINGS.iter().any(|e| token.ends_with(e))
}

/// Person slot for a known verb form.
pub fn verb_person(token: &str) -> Option<(usize, Person)> {
    VERB_FORMS.get(token).copied()
}

/// Correct form of a known verb for a person slot.
pub fn verb_form(row: usize, person: Person) -> Option<&'static str> {
    VERB_TABLE.get(row).map(|forms| forms[person])
}

/// Time adverbials that set future reference.
pub static FUTURE_ADVERBS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    HashSet::from(["утре", "вдругиден", "довечера", "догодина", "скоро"])
});

/// Nouns that make `след X` a future adverbial.
pub static FUTURE_AFTER_NOUNS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    HashSet::from([
        "малко", "минута", "минути", "час", "часа", "седмица", "месец", "година", "обяд",
    ])
});

/// Short pronoun and reflexive clitics.
pub static CLITICS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    HashSet::from([
        "се", "си", "ме", "те", "го", "я", "ни", "ви", "ги", "ми", "ти", "му", "ѝ", "им",
    ])
});

/// Clitics safe to flag in sentence-initial position. Forms that double
/// as subject pronouns or particles (те, я, ти) are excluded.
pub static CLITICS_INITIAL: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    HashSet::from(["се", "си", "ме", "го", "ни", "ви", "ги", "ми", "му", "им"])
});

/// Subject pronoun -> person slot.
pub static PRONOUN_PERSON: Lazy<HashMap<&'static str, Person>> = Lazy::new(|| {
    HashMap::from([
        ("аз", 0),
        ("ти", 1),
        ("той", 2),
        ("тя", 2),
        ("то", 2),
        ("ние", 3),
        ("вие", 4),
        ("те", 5),
    ])
});

/// Adjective paradigms: [masc, fem, neut, plural].
pub static ADJ_TABLE: &[[&str; 4]] = &[
    ["хубав", "хубава", "хубаво", "хубави"],
    ["голям", "голяма", "голямо", "големи"],
    ["малък", "малка", "малко", "малки"],
    ["нов", "нова", "ново", "нови"],
    ["стар", "стара", "старо", "стари"],
    ["добър", "добра", "добро", "добри"],
    ["вкусен", "вкусна", "вкусно", "вкусни"],
    ["интересен", "интересна", "интересно", "интересни"],
    ["красив", "красива", "красиво", "красиви"],
    ["топъл", "топла", "топло", "топли"],
    ["студен", "студена", "студено", "студени"],
    ["евтин", "евтина", "евтино", "евтини"],
    ["скъп", "скъпа", "скъпо", "скъпи"],
    ["бърз", "бърза", "бързо", "бързи"],
    ["приятен", "приятна", "приятно", "приятни"],
];

/// Adjective form -> (row in `ADJ_TABLE`, gender slot 0..3).
pub static ADJ_FORMS: Lazy<HashMap<&'static str, (usize, usize)>> = Lazy::new(|| {
    let mut m = HashMap::new();
    for (row, forms) in ADJ_TABLE.iter().enumerate() {
        for (slot, form) in forms.iter().enumerate() {
            m.entry(*form).or_insert((row, slot));
        }
    }
    m
});

/// Neuter adjective forms that double as quantity adverbs and must not
/// be "corrected" before a noun (малко вода is fine).
pub static ADVERBIAL_ADJ_FORMS: Lazy<HashSet<&'static str>> =
    Lazy::new(|| HashSet::from(["малко", "много"]));

/// Gender slot in `ADJ_TABLE` for a noun gender.
pub fn adj_slot_for(gender: Gender) -> usize {
    match gender {
        Gender::Masc | Gender::MascSoft => 0,
        Gender::Fem => 1,
        Gender::Neut => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_definite_forms() {
        assert_eq!(definite("маса", Gender::Fem, false), "масата");
        assert_eq!(definite("кафе", Gender::Neut, false), "кафето");
        assert_eq!(definite("град", Gender::Masc, false), "града");
        assert_eq!(definite("град", Gender::Masc, true), "градът");
        assert_eq!(definite("чай", Gender::MascSoft, false), "чая");
        assert_eq!(definite("учител", Gender::MascSoft, true), "учителят");
    }

    #[test]
    fn test_perfectivize_generic_and_irregular() {
        assert_eq!(perfectivize("поръчвам"), "поръчам");
        assert_eq!(perfectivize("поръчваш"), "поръчаш");
        assert_eq!(perfectivize("купувам"), "купя");
        assert_eq!(perfectivize("казваш"), "кажеш");
        assert_eq!(perfectivize("идвам"), "дойда");
        assert_eq!(perfectivize("почиваш"), "починеш");
        // -увам verbs keep their form after да
        assert_eq!(perfectivize("пътувам"), "пътувам");
        // No rule applies -> unchanged
        assert_eq!(perfectivize("чета"), "чета");
    }

    #[test]
    fn test_is_present_verb() {
        assert!(is_present_verb("поръчвам"));
        assert!(is_present_verb("работиш"));
        // Modals are handled by the да-rule, not treated as plain verbs
        assert!(!is_present_verb("искам"));
        // Nouns never match, even with verb-like endings
        assert!(!is_present_verb("вода"));
        assert!(!is_present_verb("кафе"));
    }

    #[test]
    fn test_verb_person_lookup() {
        let (row, person) = verb_person("поръчва").unwrap();
        assert_eq!(person, 2);
        assert_eq!(verb_form(row, 0), Some("поръчвам"));
    }

    #[test]
    fn test_clitic_initial_excludes_pronoun_homographs() {
        assert!(CLITICS_INITIAL.contains("се"));
        assert!(!CLITICS_INITIAL.contains("те"));
        assert!(!CLITICS_INITIAL.contains("ти"));
    }
}
