//! The detector battery
//!
//! Each detector is a pure function of the tokenized transcript. It
//! yields candidate corrections tagged with the trigger that names the
//! grammar item; unknown surface forms yield nothing.

use bgcoach_content::ContentStore;
use bgcoach_core::coach::Correction;

use crate::lexicon::{
    adj_slot_for, definite, is_present_verb, perfectivize, verb_form, verb_person, ADJ_FORMS,
    ADJ_TABLE, ADVERBIAL_ADJ_FORMS, BARE_AFTER_PREPOSITION, CLITICS, CLITICS_INITIAL, COPULAE,
    FUTURE_ADVERBS, FUTURE_AFTER_NOUNS, MODALS, NOUN_GENDERS, PREPOSITIONS, PRONOUN_PERSON,
};
use crate::normalize::Token;

/// Trigger tags consumed from the content pack.
pub const TRIGGER_ARTICLE: &str = "article_missing_definite";
pub const TRIGGER_DA: &str = "modal_bare_present";
pub const TRIGGER_FUTURE: &str = "future_no_shte";
pub const TRIGGER_CLITIC: &str = "clitic_position";
pub const TRIGGER_AGREEMENT_ADJ: &str = "agreement_adj_noun";
pub const TRIGGER_AGREEMENT_VERB: &str = "agreement_subject_verb";

pub(crate) struct DetectorCtx<'a> {
    pub text: &'a str,
    pub tokens: &'a [Token],
    pub store: &'a ContentStore,
}

fn starts_uppercase(text: &str, token: &Token) -> bool {
    text[token.start..token.end]
        .chars()
        .next()
        .is_some_and(char::is_uppercase)
}

impl<'a> DetectorCtx<'a> {
    /// Build a correction whose `before` is the literal transcript slice
    /// spanning tokens `first..=last`. Returns nothing when the trigger
    /// does not resolve in the content pack.
    fn correction(
        &self,
        category: &str,
        trigger: &str,
        first: usize,
        last: usize,
        after: String,
    ) -> Option<Correction> {
        let item = self.store.find_triggers(trigger).into_iter().next()?;
        let start = self.tokens[first].start;
        let end = self.tokens[last].end;
        let before = self.text[start..end].to_string();
        if crate::normalize::fold(&before) == crate::normalize::fold(&after) {
            return None;
        }
        Some(Correction {
            category: category.to_string(),
            before,
            after,
            note: item.micro_explanation_bg.clone(),
            error_tag: item.id.clone(),
            span: Some((start, end)),
        })
    }

    fn folded(&self, idx: usize) -> &str {
        &self.tokens[idx].folded
    }
}

/// Missing postposed definite article.
///
/// Two positions are checked: the object of certain prepositions and the
/// bare-noun subject of a copula.
pub(crate) fn detect_missing_article(ctx: &DetectorCtx) -> Vec<Correction> {
    let mut out = Vec::new();
    let n = ctx.tokens.len();

    for i in 0..n {
        let word = ctx.folded(i);

        // Preposition + bare known noun. A following proper noun is
        // apposition (в град София) and stays bare.
        if PREPOSITIONS.contains(word) && i + 1 < n {
            let noun = ctx.folded(i + 1);
            if let Some(&gender) = NOUN_GENDERS.get(noun) {
                let apposition = i + 2 < n && starts_uppercase(ctx.text, &ctx.tokens[i + 2]);
                if !BARE_AFTER_PREPOSITION.contains(noun) && !apposition {
                    let after = format!("{word} {}", definite(noun, gender, false));
                    out.extend(ctx.correction("article", TRIGGER_ARTICLE, i, i + 1, after));
                }
            }
        }

        // Clause-initial bare noun as subject of a copula.
        if i == 0 && i + 1 < n {
            if let Some(&gender) = NOUN_GENDERS.get(word) {
                if COPULAE.contains(ctx.folded(i + 1)) {
                    let after = definite(word, gender, true);
                    out.extend(ctx.correction("article", TRIGGER_ARTICLE, i, i, after));
                }
            }
        }
    }

    out
}

/// Bare present after a modal where да + present is required.
pub(crate) fn detect_da_construction(ctx: &DetectorCtx) -> Vec<Correction> {
    let mut out = Vec::new();
    let n = ctx.tokens.len();

    for i in 0..n.saturating_sub(1) {
        let modal = ctx.folded(i);
        if !MODALS.contains_key(modal) {
            continue;
        }
        let next = ctx.folded(i + 1);
        if next == "да" || next == "не" || !is_present_verb(next) {
            continue;
        }
        let after = format!("{modal} да {}", perfectivize(next));
        out.extend(ctx.correction("infinitive", TRIGGER_DA, i, i + 1, after));
    }

    out
}

/// Present indicative under a future adverbial, with no ще.
pub(crate) fn detect_future_without_shte(ctx: &DetectorCtx) -> Vec<Correction> {
    let n = ctx.tokens.len();
    let has_future_adverbial = ctx.tokens.iter().enumerate().any(|(i, t)| {
        FUTURE_ADVERBS.contains(t.folded.as_str())
            || (t.folded == "след"
                && i + 1 < n
                && FUTURE_AFTER_NOUNS.contains(ctx.folded(i + 1)))
    });
    if !has_future_adverbial {
        return Vec::new();
    }
    if ctx.tokens.iter().any(|t| t.folded == "ще") {
        return Vec::new();
    }

    let mut out = Vec::new();
    for i in 0..n {
        let word = ctx.folded(i);
        if !is_present_verb(word) {
            continue;
        }
        // да-clauses keep the bare present (ще only marks the matrix verb).
        if i > 0 && ctx.folded(i - 1) == "да" {
            continue;
        }
        let after = format!("ще {word}");
        out.extend(ctx.correction("future", TRIGGER_FUTURE, i, i, after));
        break; // one correction per utterance is enough
    }

    out
}

/// Clitic in a forbidden position.
///
/// Two Wackernagel violations are covered: a clitic opening the clause
/// and a clitic trailing the verb under negation.
pub(crate) fn detect_clitic_misplacement(ctx: &DetectorCtx) -> Vec<Correction> {
    let mut out = Vec::new();
    let n = ctx.tokens.len();

    // Clause-initial clitic followed by its verb.
    if n >= 2 {
        let first = ctx.folded(0);
        if CLITICS_INITIAL.contains(first) && is_present_verb(ctx.folded(1)) {
            let after = format!("{} {first}", ctx.folded(1));
            out.extend(ctx.correction("clitic", TRIGGER_CLITIC, 0, 1, after));
        }
    }

    // не + verb + clitic: the clitic belongs directly after не.
    for i in 0..n.saturating_sub(2) {
        if ctx.folded(i) != "не" {
            continue;
        }
        let verb = ctx.folded(i + 1);
        let clitic = ctx.folded(i + 2);
        if is_present_verb(verb) && CLITICS.contains(clitic) {
            let after = format!("не {clitic} {verb}");
            out.extend(ctx.correction("clitic", TRIGGER_CLITIC, i, i + 2, after));
        }
    }

    out
}

/// Nominal and subject-verb agreement.
pub(crate) fn detect_agreement(ctx: &DetectorCtx) -> Vec<Correction> {
    let mut out = Vec::new();
    let n = ctx.tokens.len();

    for i in 0..n.saturating_sub(1) {
        let word = ctx.folded(i);

        // Adjective + noun gender mismatch.
        if let Some(&(row, slot)) = ADJ_FORMS.get(word) {
            if !ADVERBIAL_ADJ_FORMS.contains(word) {
                if let Some(&gender) = NOUN_GENDERS.get(ctx.folded(i + 1)) {
                    let expected = adj_slot_for(gender);
                    if slot != expected && slot != 3 {
                        let after = format!("{} {}", ADJ_TABLE[row][expected], ctx.folded(i + 1));
                        out.extend(ctx.correction(
                            "agreement",
                            TRIGGER_AGREEMENT_ADJ,
                            i,
                            i + 1,
                            after,
                        ));
                    }
                }
            }
        }

        // Subject pronoun + verb person mismatch. Modal forms of искам
        // are covered through the verb table; трябва is impersonal.
        if let Some(&person) = PRONOUN_PERSON.get(word) {
            let next = ctx.folded(i + 1);
            if next == "трябва" {
                continue;
            }
            if let Some((row, form_person)) = verb_person(next) {
                if form_person != person {
                    if let Some(correct) = verb_form(row, person) {
                        let after = format!("{word} {correct}");
                        out.extend(ctx.correction(
                            "agreement",
                            TRIGGER_AGREEMENT_VERB,
                            i,
                            i + 1,
                            after,
                        ));
                    }
                }
            }
        }
    }

    out
}
