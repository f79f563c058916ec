//! Natural ("human") ordering of strings
//!
//! Digit runs compare by numeric value, everything else compares by
//! character, so `img9.png` sorts before `img10.png`.

use std::cmp::Ordering;
use std::iter::Peekable;
use std::str::Chars;

/// Compares two strings in natural order
///
/// Numerically equal digit runs with different zero padding are ordered by
/// the shorter run first, so the ordering stays total.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = a.chars().peekable();
    let mut right = b.chars().peekable();

    loop {
        match (left.peek().copied(), right.peek().copied()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) if l.is_ascii_digit() && r.is_ascii_digit() => {
                let l_run = take_digits(&mut left);
                let r_run = take_digits(&mut right);
                let ordering = compare_digit_runs(&l_run, &r_run);
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            (Some(l), Some(r)) => {
                if l != r {
                    return l.cmp(&r);
                }
                left.next();
                right.next();
            }
        }
    }
}

/// Sorts a slice of strings in natural order
///
/// # Examples
///
/// ```
/// use gallery_mirror::url::sort_naturally;
///
/// let mut names = vec!["img2.png", "img10.png", "img1.png"];
/// sort_naturally(&mut names);
/// assert_eq!(names, ["img1.png", "img2.png", "img10.png"]);
/// ```
pub fn sort_naturally<S: AsRef<str>>(items: &mut [S]) {
    items.sort_by(|a, b| natural_cmp(a.as_ref(), b.as_ref()));
}

fn take_digits(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut run = String::new();
    while let Some(c) = chars.peek().copied() {
        if !c.is_ascii_digit() {
            break;
        }
        run.push(c);
        chars.next();
    }
    run
}

fn compare_digit_runs(a: &str, b: &str) -> Ordering {
    let a_trimmed = a.trim_start_matches('0');
    let b_trimmed = b.trim_start_matches('0');

    // Without leading zeros, a longer run is a larger number
    a_trimmed
        .len()
        .cmp(&b_trimmed.len())
        .then_with(|| a_trimmed.cmp(b_trimmed))
        .then_with(|| a.len().cmp(&b.len()))
}
