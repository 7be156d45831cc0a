//! Maps a time of day onto the words of a word-clock face.
//!
//! The face shows time to the nearest five minutes, rounded down: "five past two",
//! "twenty-five to ten", "three o'clock". See [`render`] and [`Phrase`].

use core::fmt::{self, Write as _};

use heapless::String;

use crate::error::{ContractViolation, Error, Result};
use crate::raw_time::SemanticTime;

/// Number of individually lit words on the face.
pub const WORD_COUNT: usize = 20;

/// Room for the longest phrase, "twenty-five past eleven".
pub const PHRASE_TEXT_LEN: usize = 32;

/// One lit word on the face. The discriminant is the word's output index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Word {
    One,
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Ten,
    Eleven,
    Twelve,
    OClock,
    FiveMinutes,
    TenMinutes,
    Quarter,
    Twenty,
    Half,
    Past,
    To,
}

impl Word {
    /// Every word, in output order.
    pub const ALL: [Self; WORD_COUNT] = [
        Self::One,
        Self::Two,
        Self::Three,
        Self::Four,
        Self::Five,
        Self::Six,
        Self::Seven,
        Self::Eight,
        Self::Nine,
        Self::Ten,
        Self::Eleven,
        Self::Twelve,
        Self::OClock,
        Self::FiveMinutes,
        Self::TenMinutes,
        Self::Quarter,
        Self::Twenty,
        Self::Half,
        Self::Past,
        Self::To,
    ];

    /// The hour word for 1 through 12.
    ///
    /// # Errors
    ///
    /// Returns [`ContractViolation::RenderHour`] for anything outside 1..=12.
    pub const fn hour(hour: u8) -> Result<Self, ContractViolation> {
        Ok(match hour {
            1 => Self::One,
            2 => Self::Two,
            3 => Self::Three,
            4 => Self::Four,
            5 => Self::Five,
            6 => Self::Six,
            7 => Self::Seven,
            8 => Self::Eight,
            9 => Self::Nine,
            10 => Self::Ten,
            11 => Self::Eleven,
            12 => Self::Twelve,
            _ => return Err(ContractViolation::RenderHour(hour)),
        })
    }

    /// The output index driving this word.
    #[must_use]
    pub const fn index(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::One => "one",
            Self::Two => "two",
            Self::Three => "three",
            Self::Four => "four",
            Self::Five | Self::FiveMinutes => "five",
            Self::Six => "six",
            Self::Seven => "seven",
            Self::Eight => "eight",
            Self::Nine => "nine",
            Self::Ten | Self::TenMinutes => "ten",
            Self::Eleven => "eleven",
            Self::Twelve => "twelve",
            Self::OClock => "o'clock",
            Self::Quarter => "quarter",
            Self::Twenty => "twenty",
            Self::Half => "half",
            Self::Past => "past",
            Self::To => "to",
        }
    }
}

/// How far past or before the hour, in the face's vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MinuteWords {
    Five,
    Ten,
    Quarter,
    Twenty,
    TwentyFive,
    Half,
}

impl MinuteWords {
    /// The words for a distance from the hour of 5 through 30 minutes.
    const fn from_distance(minutes: u8) -> Option<Self> {
        match minutes {
            5 => Some(Self::Five),
            10 => Some(Self::Ten),
            15 => Some(Self::Quarter),
            20 => Some(Self::Twenty),
            25 => Some(Self::TwentyFive),
            30 => Some(Self::Half),
            _ => None,
        }
    }

    const fn words(self) -> (Word, Option<Word>) {
        match self {
            Self::Five => (Word::FiveMinutes, None),
            Self::Ten => (Word::TenMinutes, None),
            Self::Quarter => (Word::Quarter, None),
            Self::Twenty => (Word::Twenty, None),
            Self::TwentyFive => (Word::Twenty, Some(Word::FiveMinutes)),
            Self::Half => (Word::Half, None),
        }
    }
}

/// A rendered time, ready for the face.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phrase {
    /// "nine o'clock"
    OClock { hour: Word },
    /// "half past nine"
    Past { minutes: MinuteWords, hour: Word },
    /// "twenty-five to ten"; `hour` is already the following hour.
    To { minutes: MinuteWords, hour: Word },
}

impl Phrase {
    /// The words in reading order.
    pub fn words(&self) -> impl Iterator<Item = Word> {
        let (first, second, third, fourth) = match *self {
            Self::OClock { hour } => (hour, Some(Word::OClock), None, None),
            Self::Past { minutes, hour } => Self::relative(minutes, Word::Past, hour),
            Self::To { minutes, hour } => Self::relative(minutes, Word::To, hour),
        };
        [Some(first), second, third, fourth].into_iter().flatten()
    }

    const fn relative(
        minutes: MinuteWords,
        relation: Word,
        hour: Word,
    ) -> (Word, Option<Word>, Option<Word>, Option<Word>) {
        match minutes.words() {
            (first, None) => (first, Some(relation), Some(hour), None),
            (first, Some(second)) => (first, Some(second), Some(relation), Some(hour)),
        }
    }

    /// The set of words this phrase lights.
    #[must_use]
    pub fn lit_words(&self) -> LitWords {
        self.words().fold(LitWords::EMPTY, LitWords::with)
    }

    /// The phrase as text, e.g. `"twenty-five to ten"`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FormatError`] if the text does not fit.
    pub fn text(&self) -> Result<String<PHRASE_TEXT_LEN>> {
        let mut text = String::new();
        write!(text, "{self}").map_err(|_| Error::FormatError)?;
        Ok(text)
    }
}

impl fmt::Display for Phrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut previous: Option<Word> = None;
        for word in self.words() {
            match previous {
                None => {}
                Some(Word::Twenty) if word == Word::FiveMinutes => f.write_str("-")?,
                Some(_) => f.write_str(" ")?,
            }
            f.write_str(word.as_str())?;
            previous = Some(word);
        }
        Ok(())
    }
}

/// Render an hour (1..=12) and a minute that is a multiple of five (0..=55).
///
/// From 35 minutes on the phrase counts down to the next hour, so 9:35 is "twenty-five to ten"
/// and 12:40 is "twenty to one".
///
/// # Errors
///
/// Returns a [`ContractViolation`] if the hour is not in 1..=12 or the minutes are not a multiple
/// of five in 0..=55. Callers round first; see [`render_time`].
#[expect(
    clippy::arithmetic_side_effects,
    reason = "minutes is 35..=55 in that arm and hour is 1..=12"
)]
pub const fn render(hour: u8, minutes: u8) -> Result<Phrase, ContractViolation> {
    let hour_word = match Word::hour(hour) {
        Ok(word) => word,
        Err(violation) => return Err(violation),
    };
    match minutes {
        0 => Ok(Phrase::OClock { hour: hour_word }),
        5..=30 => match MinuteWords::from_distance(minutes) {
            Some(minute_words) => Ok(Phrase::Past {
                minutes: minute_words,
                hour: hour_word,
            }),
            None => Err(ContractViolation::RenderMinutes(minutes)),
        },
        35..=55 => {
            let next_hour = if hour == 12 { 1 } else { hour + 1 };
            match (MinuteWords::from_distance(60 - minutes), Word::hour(next_hour)) {
                (Some(minute_words), Ok(next_hour_word)) => Ok(Phrase::To {
                    minutes: minute_words,
                    hour: next_hour_word,
                }),
                (_, Err(violation)) => Err(violation),
                (None, Ok(_)) => Err(ContractViolation::RenderMinutes(minutes)),
            }
        }
        _ => Err(ContractViolation::RenderMinutes(minutes)),
    }
}

/// Render a decoded time, rounding the minutes down to a multiple of five.
///
/// # Errors
///
/// Cannot fail for a decoded [`SemanticTime`]; the violation is passed on from [`render`].
#[expect(
    clippy::arithmetic_side_effects,
    clippy::integer_division_remainder_used,
    reason = "minutes % 5 <= minutes"
)]
pub const fn render_time(time: &SemanticTime) -> Result<Phrase, ContractViolation> {
    let minutes = time.minutes();
    render(time.face_hour(), minutes - minutes % 5)
}

/// The set of lit words on the face, one bit per [`Word::index`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LitWords(u32);

impl LitWords {
    /// Nothing lit.
    pub const EMPTY: Self = Self(0);

    #[must_use]
    pub const fn with(self, word: Word) -> Self {
        Self(self.0 | (1 << word.index()))
    }

    #[must_use]
    pub const fn contains(self, word: Word) -> bool {
        self.0 & (1 << word.index()) != 0
    }

    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// The lit words in output order.
    pub fn iter(self) -> impl Iterator<Item = Word> {
        Word::ALL.into_iter().filter(move |&word| self.contains(word))
    }
}

/// Something that can switch individual words on the face.
pub trait WordOutputs {
    /// Switch one word on or off.
    ///
    /// # Errors
    ///
    /// Returns an error if the word has no output.
    fn set_word(&mut self, word: Word, lit: bool) -> Result<()>;
}

/// Replace everything on the face with `lit`.
///
/// Every word is switched off before any word of the new set is switched on, so two unrelated
/// phrases are never visible together.
///
/// # Errors
///
/// Returns the first error from [`WordOutputs::set_word`].
pub fn set_display_words(outputs: &mut impl WordOutputs, lit: LitWords) -> Result<()> {
    for word in Word::ALL {
        outputs.set_word(word, false)?;
    }
    for word in lit.iter() {
        outputs.set_word(word, true)?;
    }
    Ok(())
}
