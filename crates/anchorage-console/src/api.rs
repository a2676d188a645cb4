//! Script-side handles for the host bindings.
//!
//! Each handle wraps a weak reference (or a value snapshot for `Host`), so a
//! script can never keep a closed document alive. Using a handle whose
//! document has gone away raises a script error instead of panicking.

use std::cell::RefCell;
use std::rc::Weak;

use anchorage_engine::{Document, DocumentRef, HostContext, HostInfo, Structure, View, ViewRef};
use rhai::{Array, Dynamic, Engine, EvalAltResult, INT};

type ScriptResult<T> = Result<T, Box<EvalAltResult>>;

#[derive(Debug, Clone)]
pub struct DocHandle(Weak<RefCell<Document>>);

#[derive(Debug, Clone)]
pub struct ViewHandle(Weak<RefCell<View>>);

#[derive(Debug, Clone)]
pub struct StructHandle(Structure);

#[derive(Debug, Clone)]
pub struct HostHandle(HostInfo);

/// The four bindings for a context, as script values (unit when absent)
pub(crate) fn bindings(context: &HostContext) -> [(&'static str, Dynamic); 4] {
    let doc = context
        .document
        .clone()
        .map(|document| Dynamic::from(DocHandle(document)))
        .unwrap_or(Dynamic::UNIT);
    let view = context
        .view
        .clone()
        .map(|view| Dynamic::from(ViewHandle(view)))
        .unwrap_or(Dynamic::UNIT);
    let structure = context
        .structure
        .clone()
        .map(|structure| Dynamic::from(StructHandle(structure)))
        .unwrap_or(Dynamic::UNIT);
    let host = Dynamic::from(HostHandle(context.host.clone()));

    [("Host", host), ("View", view), ("Doc", doc), ("Struct", structure)]
}

pub(crate) fn register(engine: &mut Engine) {
    engine
        .register_type_with_name::<DocHandle>("Document")
        .register_get("Length", doc_length)
        .register_get("name", doc_name)
        .register_get("text", doc_text)
        .register_fn("slice", doc_slice)
        .register_fn("insert", doc_insert)
        .register_fn("delete", doc_delete);

    engine
        .register_type_with_name::<ViewHandle>("View")
        .register_get("selection_start", view_selection_start)
        .register_get("selection_end", view_selection_end)
        .register_get("selected_text", view_selected_text)
        .register_fn("select", view_select);

    engine
        .register_type_with_name::<StructHandle>("Structure")
        .register_get("line_count", struct_line_count)
        .register_fn("line", struct_line)
        .register_fn("line_of", struct_line_of);

    engine
        .register_type_with_name::<HostHandle>("Host")
        .register_get("documents", host_documents)
        .register_get("active", host_active);
}

fn upgrade_document(handle: &DocHandle) -> ScriptResult<DocumentRef> {
    handle
        .0
        .upgrade()
        .ok_or_else(|| "the bound document is no longer open".into())
}

fn upgrade_view(handle: &ViewHandle) -> ScriptResult<ViewRef> {
    handle
        .0
        .upgrade()
        .ok_or_else(|| "the bound view is no longer open".into())
}

fn to_offset(value: INT) -> ScriptResult<usize> {
    usize::try_from(value).map_err(|_| format!("offset {value} is negative").into())
}

fn to_int(value: usize) -> INT {
    INT::try_from(value).unwrap_or(INT::MAX)
}

fn doc_length(handle: &mut DocHandle) -> ScriptResult<INT> {
    Ok(to_int(upgrade_document(handle)?.borrow().len_chars()))
}

fn doc_name(handle: &mut DocHandle) -> ScriptResult<String> {
    Ok(upgrade_document(handle)?.borrow().name().to_string())
}

fn doc_text(handle: &mut DocHandle) -> ScriptResult<String> {
    Ok(upgrade_document(handle)?.borrow().buffer().text())
}

fn doc_slice(handle: &mut DocHandle, start: INT, end: INT) -> ScriptResult<String> {
    let document = upgrade_document(handle)?;
    let document = document.borrow();
    let text = document
        .buffer()
        .slice(to_offset(start)?..to_offset(end)?)
        .map_err(|err| err.to_string())?;
    Ok(text.into_owned())
}

fn doc_insert(handle: &mut DocHandle, at: INT, text: &str) -> ScriptResult<()> {
    let document = upgrade_document(handle)?;
    let mut document = document
        .try_borrow_mut()
        .map_err(|_| "the bound document is busy")?;
    document
        .buffer_mut()
        .insert(to_offset(at)?, text)
        .map_err(|err| err.to_string())?;
    Ok(())
}

fn doc_delete(handle: &mut DocHandle, start: INT, end: INT) -> ScriptResult<()> {
    let document = upgrade_document(handle)?;
    let mut document = document
        .try_borrow_mut()
        .map_err(|_| "the bound document is busy")?;
    document
        .buffer_mut()
        .delete(to_offset(start)?..to_offset(end)?)
        .map_err(|err| err.to_string())?;
    Ok(())
}

fn view_selection_start(handle: &mut ViewHandle) -> ScriptResult<INT> {
    Ok(to_int(upgrade_view(handle)?.borrow().selection().start))
}

fn view_selection_end(handle: &mut ViewHandle) -> ScriptResult<INT> {
    Ok(to_int(upgrade_view(handle)?.borrow().selection().end))
}

fn view_selected_text(handle: &mut ViewHandle) -> ScriptResult<String> {
    Ok(upgrade_view(handle)?.borrow().selected_text())
}

fn view_select(handle: &mut ViewHandle, start: INT, end: INT) -> ScriptResult<()> {
    let view = upgrade_view(handle)?;
    view.borrow_mut()
        .set_selection(to_offset(start)?, to_offset(end)?);
    Ok(())
}

fn struct_line_count(handle: &mut StructHandle) -> ScriptResult<INT> {
    let count = handle.0.line_count().map_err(|err| err.to_string())?;
    Ok(to_int(count))
}

fn struct_line(handle: &mut StructHandle, line: INT) -> ScriptResult<String> {
    handle
        .0
        .line(to_offset(line)?)
        .map_err(|err| err.to_string().into())
}

fn struct_line_of(handle: &mut StructHandle, offset: INT) -> ScriptResult<INT> {
    let line = handle
        .0
        .line_of(to_offset(offset)?)
        .map_err(|err| err.to_string())?;
    Ok(to_int(line))
}

fn host_documents(handle: &mut HostHandle) -> Array {
    handle.0.documents.iter().cloned().map(Dynamic::from).collect()
}

fn host_active(handle: &mut HostHandle) -> Dynamic {
    handle
        .0
        .active
        .clone()
        .map(Dynamic::from)
        .unwrap_or(Dynamic::UNIT)
}
