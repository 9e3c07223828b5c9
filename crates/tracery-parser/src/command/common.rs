//! Commands every diagram type understands.

use log::trace;

use tracery_core::{label::Label, model::HasMeta};

use super::{
    Command, CommandResult, LineLocation, MultiLineCommand, MultiLineMatch, RegexResult,
    SingleLineCommand, Trim,
};

fn ignore<D>(_: &mut D, _: &RegexResult<'_>, _: LineLocation) -> CommandResult {
    Ok(())
}

fn ignore_block<D>(_: &mut D, _: &MultiLineMatch<'_>) -> CommandResult {
    Ok(())
}

fn title<D: HasMeta>(diagram: &mut D, arg: &RegexResult<'_>, _: LineLocation) -> CommandResult {
    let text = arg.get("TEXT").unwrap_or_default();
    diagram.meta_mut().title = Some(Label::with_newlines(text));
    Ok(())
}

fn header<D: HasMeta>(diagram: &mut D, arg: &RegexResult<'_>, _: LineLocation) -> CommandResult {
    let text = arg.get("TEXT").unwrap_or_default();
    diagram.meta_mut().header = Some(Label::with_newlines(text));
    Ok(())
}

fn footer<D: HasMeta>(diagram: &mut D, arg: &RegexResult<'_>, _: LineLocation) -> CommandResult {
    let text = arg.get("TEXT").unwrap_or_default();
    diagram.meta_mut().footer = Some(Label::with_newlines(text));
    Ok(())
}

fn caption<D: HasMeta>(diagram: &mut D, arg: &RegexResult<'_>, _: LineLocation) -> CommandResult {
    let text = arg.get("TEXT").unwrap_or_default();
    diagram.meta_mut().caption = Some(Label::with_newlines(text));
    Ok(())
}

fn title_block<D: HasMeta>(diagram: &mut D, matched: &MultiLineMatch<'_>) -> CommandResult {
    let lines = matched.body(false).iter().map(|line| line.to_string());
    diagram.meta_mut().title = Some(Label::from_lines(lines));
    Ok(())
}

fn skin_param<D: HasMeta>(diagram: &mut D, arg: &RegexResult<'_>, _: LineLocation) -> CommandResult {
    let key = arg.get("KEY").unwrap_or_default().to_ascii_lowercase();
    let value = arg.get("VALUE").unwrap_or_default().trim().to_string();
    trace!(key = key.as_str(), value = value.as_str(); "Setting skin parameter");
    diagram.meta_mut().skin_params.insert(key, value);
    Ok(())
}

/// Commands shared by all diagram types, in matching order.
pub fn common_commands<D: HasMeta + 'static>() -> Vec<Box<dyn Command<D>>> {
    vec![
        SingleLineCommand::new("blank", r"^$", ignore::<D>).boxed(),
        SingleLineCommand::new("comment", r"^'.*$", ignore::<D>).boxed(),
        SingleLineCommand::new("comment_inline_block", r"^/'.*'/$", ignore::<D>).boxed(),
        MultiLineCommand::new("comment_block", r"^/'", r"'/$", Trim::None, ignore_block::<D>)
            .boxed(),
        SingleLineCommand::new("title", r"^(?i:title)(?:\s*:\s*|\s+)(?P<TEXT>.*\S)$", title::<D>)
            .boxed(),
        MultiLineCommand::new("title_block", r"^(?i:title)$", r"^(?i:end\s?title)$", Trim::Both, title_block::<D>)
            .boxed(),
        SingleLineCommand::new(
            "header",
            r"^(?i:(?:left|right|center)\s+)?(?i:header)(?:\s*:\s*|\s+)(?P<TEXT>.*\S)$",
            header::<D>,
        )
        .boxed(),
        SingleLineCommand::new(
            "footer",
            r"^(?i:(?:left|right|center)\s+)?(?i:footer)(?:\s*:\s*|\s+)(?P<TEXT>.*\S)$",
            footer::<D>,
        )
        .boxed(),
        SingleLineCommand::new("caption", r"^(?i:caption)(?:\s*:\s*|\s+)(?P<TEXT>.*\S)$", caption::<D>)
            .boxed(),
        SingleLineCommand::new(
            "skinparam",
            r"^(?i:skinparam)\s+(?P<KEY>[\w.]+)\s+(?P<VALUE>[^{\s].*)$",
            skin_param::<D>,
        )
        .boxed(),
    ]
}
