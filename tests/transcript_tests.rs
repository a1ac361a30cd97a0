//! Tests for transcript assembly and turn commit ordering.

use douane::live::{Speaker, TranscriptAssembler};

#[test]
fn fragments_concatenate_and_commit_in_user_model_order() {
    let mut assembler = TranscriptAssembler::new();

    assembler.push_input("Hel");
    assembler.push_input("lo");
    assembler.push_output("Hi");

    let (user, model) = assembler.commit();
    assert_eq!(user.speaker, Speaker::User);
    assert_eq!(user.text, "Hello");
    assert_eq!(model.speaker, Speaker::Model);
    assert_eq!(model.text, "Hi");
}

#[test]
fn commit_resets_both_accumulators() {
    let mut assembler = TranscriptAssembler::new();
    assembler.push_input("first turn");
    assembler.push_output("reply");
    assembler.commit();
    assert!(assembler.is_empty());

    assembler.push_input("second");
    let (user, model) = assembler.commit();
    assert_eq!(user.text, "second");
    assert_eq!(model.text, "");
}

#[test]
fn committed_text_is_trimmed() {
    let mut assembler = TranscriptAssembler::new();
    assembler.push_input("  padded ");
    assembler.push_output("\nanswer\n");

    let (user, model) = assembler.commit();
    assert_eq!(user.text, "padded");
    assert_eq!(model.text, "answer");
}

#[test]
fn interleaved_arrival_does_not_change_commit_order() {
    let mut assembler = TranscriptAssembler::new();
    assembler.push_output("I ");
    assembler.push_input("what is ");
    assembler.push_output("can help");
    assembler.push_input("VAT?");

    let (user, model) = assembler.commit();
    assert_eq!(user.text, "what is VAT?");
    assert_eq!(model.text, "I can help");
}
