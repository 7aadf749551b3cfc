//! View Container Tests
//!
//! Covers positional reconciliation of embedded views: creation, reuse,
//! removal and the contract errors of the container instructions.

use std::cell::Cell;
use std::rc::Rc;

use angular_core::{bind, Instructions, RenderError, Result, TemplateFixture};

#[path = "common.rs"]
mod common;
use common::tracked_def;

#[cfg(test)]
mod tests {
    use super::*;

    // % if (show) { <span tracked>shown</span> }
    fn toggle(rt: &mut Instructions<'_>, show: &bool, cm: bool) -> Result<()> {
        if cm {
            rt.container(0)?;
        }
        rt.container_refresh_start(0)?;
        if *show {
            if rt.embedded_view_start(0)? {
                rt.element_start(0, "span", &[("tracked", "")], &[])?;
                rt.text(1, Some("shown"))?;
                rt.element_end()?;
            }
            rt.embedded_view_end()?;
        }
        rt.container_refresh_end()
    }

    #[test]
    fn should_add_and_remove_views() {
        let destroyed = Rc::new(Cell::new(0));
        let mut fixture = TemplateFixture::new(toggle, vec![tracked_def("[tracked]", destroyed.clone())]);

        assert_eq!(fixture.render(&true).unwrap(), r#"<span tracked="">shown</span>"#);
        let first = fixture.view().container(0).unwrap().views()[0].load_directive(0, 0).unwrap();

        assert_eq!(fixture.render(&true).unwrap(), r#"<span tracked="">shown</span>"#);
        let again = fixture.view().container(0).unwrap().views()[0].load_directive(0, 0).unwrap();
        assert!(first.ptr_eq(&again));
        assert_eq!(destroyed.get(), 0);

        assert_eq!(fixture.render(&false).unwrap(), "");
        assert!(fixture.view().container(0).unwrap().is_empty());
        assert_eq!(destroyed.get(), 1);

        assert_eq!(fixture.render(&true).unwrap(), r#"<span tracked="">shown</span>"#);
        let recreated = fixture.view().container(0).unwrap().views()[0].load_directive(0, 0).unwrap();
        assert!(!first.ptr_eq(&recreated));
        assert_eq!(destroyed.get(), 1);
    }

    // % if (flag) { yes } else { no }
    fn if_else(rt: &mut Instructions<'_>, flag: &bool, cm: bool) -> Result<()> {
        if cm {
            rt.element_start(0, "div", &[], &[])?;
            rt.container(1)?;
            rt.element_end()?;
        }
        rt.container_refresh_start(1)?;
        if *flag {
            if rt.embedded_view_start(0)? {
                rt.text(0, Some("yes"))?;
            }
            rt.embedded_view_end()?;
        } else {
            if rt.embedded_view_start(1)? {
                rt.text(0, Some("no"))?;
            }
            rt.embedded_view_end()?;
        }
        rt.container_refresh_end()
    }

    #[test]
    fn should_switch_between_blocks() {
        let mut fixture = TemplateFixture::new(if_else, vec![]);
        assert_eq!(fixture.render(&true).unwrap(), "<div>yes</div>");
        assert_eq!(fixture.render(&false).unwrap(), "<div>no</div>");
        assert_eq!(fixture.view().container(1).unwrap().len(), 1);
        assert_eq!(fixture.view().container(1).unwrap().views()[0].block_id(), Some(1));
        assert_eq!(fixture.render(&true).unwrap(), "<div>yes</div>");
    }

    struct Flags {
        first: bool,
        second: bool,
    }

    // % if (first) { A } % if (second) { B }
    fn two_blocks(rt: &mut Instructions<'_>, flags: &Flags, cm: bool) -> Result<()> {
        if cm {
            rt.container(0)?;
        }
        rt.container_refresh_start(0)?;
        if flags.first {
            if rt.embedded_view_start(0)? {
                rt.text(0, Some("A"))?;
            }
            rt.embedded_view_end()?;
        }
        if flags.second {
            if rt.embedded_view_start(1)? {
                rt.text(0, Some("B"))?;
            }
            rt.embedded_view_end()?;
        }
        rt.container_refresh_end()
    }

    #[test]
    fn should_destroy_skipped_blocks_and_keep_later_ones() {
        let both = Flags {
            first: true,
            second: true,
        };
        let only_second = Flags {
            first: false,
            second: true,
        };

        let mut fixture = TemplateFixture::new(two_blocks, vec![]);
        assert_eq!(fixture.render(&both).unwrap(), "AB");
        let b = fixture.view().container(0).unwrap().views()[1].load(0).unwrap();

        assert_eq!(fixture.render(&only_second).unwrap(), "B");
        let container = fixture.view().container(0).unwrap();
        assert_eq!(container.len(), 1);
        assert_eq!(container.views()[0].load(0).unwrap(), b);

        // Block 0 is recreated in front of the surviving block 1.
        assert_eq!(fixture.render(&both).unwrap(), "AB");
        let container = fixture.view().container(0).unwrap();
        assert_eq!(container.views()[1].load(0).unwrap(), b);
    }

    // <ul>% for (i in 0..count) { <li>{{ i }}</li> }</ul>!
    fn repeat(rt: &mut Instructions<'_>, count: &usize, cm: bool) -> Result<()> {
        if cm {
            rt.element_start(0, "ul", &[], &[])?;
            rt.container(1)?;
            rt.element_end()?;
            rt.text(2, Some("!"))?;
        }
        rt.container_refresh_start(1)?;
        for i in 0..*count {
            if rt.embedded_view_start(0)? {
                rt.element_start(0, "li", &[], &[])?;
                rt.text(1, None)?;
                rt.element_end()?;
            }
            rt.text_binding(1, bind(i))?;
            rt.embedded_view_end()?;
        }
        rt.container_refresh_end()
    }

    #[test]
    fn should_reconcile_repeated_views_by_position() {
        let mut fixture = TemplateFixture::new(repeat, vec![]);
        assert_eq!(fixture.render(&3).unwrap(), "<ul><li>0</li><li>1</li><li>2</li></ul>!");
        assert_eq!(fixture.render(&1).unwrap(), "<ul><li>0</li></ul>!");
        assert_eq!(
            fixture.render(&4).unwrap(),
            "<ul><li>0</li><li>1</li><li>2</li><li>3</li></ul>!"
        );
        assert_eq!(fixture.render(&0).unwrap(), "<ul></ul>!");
        assert_eq!(fixture.view().container(1).unwrap().len(), 0);
    }

    struct Grid {
        show: bool,
        rows: usize,
    }

    // % if (show) { <table tracked>% for (rows) { <tr tracked></tr> }</table> }
    fn nested(rt: &mut Instructions<'_>, grid: &Grid, cm: bool) -> Result<()> {
        if cm {
            rt.container(0)?;
        }
        rt.container_refresh_start(0)?;
        if grid.show {
            if rt.embedded_view_start(0)? {
                rt.element_start(0, "table", &[("tracked", "")], &[])?;
                rt.container(1)?;
                rt.element_end()?;
            }
            rt.container_refresh_start(1)?;
            for _ in 0..grid.rows {
                if rt.embedded_view_start(0)? {
                    rt.element_start(0, "tr", &[("tracked", "")], &[])?;
                    rt.element_end()?;
                }
                rt.embedded_view_end()?;
            }
            rt.container_refresh_end()?;
            rt.embedded_view_end()?;
        }
        rt.container_refresh_end()
    }

    #[test]
    fn should_destroy_nested_views_with_their_parent() {
        let destroyed = Rc::new(Cell::new(0));
        let mut fixture = TemplateFixture::new(nested, vec![tracked_def("[tracked]", destroyed.clone())]);

        let html = fixture.render(&Grid { show: true, rows: 2 }).unwrap();
        assert_eq!(html, r#"<table tracked=""><tr tracked=""></tr><tr tracked=""></tr></table>"#);

        fixture.render(&Grid { show: true, rows: 1 }).unwrap();
        assert_eq!(destroyed.get(), 1);

        assert_eq!(fixture.render(&Grid { show: false, rows: 1 }).unwrap(), "");
        // The table and its remaining row.
        assert_eq!(destroyed.get(), 3);
    }

    // a% if (show) { b% if (show) { c }d }e
    fn root_level_nesting(rt: &mut Instructions<'_>, show: &bool, cm: bool) -> Result<()> {
        if cm {
            rt.text(0, Some("a"))?;
            rt.container(1)?;
            rt.text(2, Some("e"))?;
        }
        rt.container_refresh_start(1)?;
        if *show {
            if rt.embedded_view_start(0)? {
                rt.text(0, Some("b"))?;
                rt.container(1)?;
                rt.text(2, Some("d"))?;
            }
            rt.container_refresh_start(1)?;
            if *show {
                if rt.embedded_view_start(0)? {
                    rt.text(0, Some("c"))?;
                }
                rt.embedded_view_end()?;
            }
            rt.container_refresh_end()?;
            rt.embedded_view_end()?;
        }
        rt.container_refresh_end()
    }

    #[test]
    fn should_place_root_level_nested_views_in_order() {
        let mut fixture = TemplateFixture::new(root_level_nesting, vec![]);
        assert_eq!(fixture.render(&true).unwrap(), "abcde");
        assert_eq!(fixture.render(&false).unwrap(), "ae");
        assert_eq!(fixture.render(&true).unwrap(), "abcde");
    }

    fn double_refresh_start(rt: &mut Instructions<'_>, _: &(), cm: bool) -> Result<()> {
        if cm {
            rt.container(0)?;
            rt.container(1)?;
        }
        rt.container_refresh_start(0)?;
        rt.container_refresh_start(1)
    }

    fn refresh_end_without_start(rt: &mut Instructions<'_>, _: &(), _: bool) -> Result<()> {
        rt.container_refresh_end()
    }

    fn refresh_never_closed(rt: &mut Instructions<'_>, _: &(), cm: bool) -> Result<()> {
        if cm {
            rt.container(0)?;
        }
        rt.container_refresh_start(0)
    }

    fn view_end_without_start(rt: &mut Instructions<'_>, _: &(), cm: bool) -> Result<()> {
        if cm {
            rt.container(0)?;
        }
        rt.container_refresh_start(0)?;
        rt.embedded_view_end()
    }

    fn refresh_unknown_slot(rt: &mut Instructions<'_>, _: &(), _: bool) -> Result<()> {
        rt.container_refresh_start(4)
    }

    #[test]
    fn should_reject_unbalanced_container_instructions() {
        let cases: Vec<fn(&mut Instructions<'_>, &(), bool) -> Result<()>> = vec![
            double_refresh_start,
            refresh_end_without_start,
            refresh_never_closed,
            view_end_without_start,
        ];
        for template in cases {
            let result = TemplateFixture::new(template, vec![]).render(&());
            assert!(
                matches!(result, Err(RenderError::ContainerReconciliation(_))),
                "unexpected result {:?}",
                result
            );
        }

        let result = TemplateFixture::new(refresh_unknown_slot, vec![]).render(&());
        assert!(matches!(result, Err(RenderError::SlotNotFound { index: 4 })));
    }

    struct Blocks {
        a: bool,
        empty: bool,
        c: bool,
    }

    // % if (a) { A } % if (empty) { } % if (c) { C }
    fn with_empty_block(rt: &mut Instructions<'_>, blocks: &Blocks, cm: bool) -> Result<()> {
        if cm {
            rt.container(0)?;
        }
        rt.container_refresh_start(0)?;
        if blocks.a {
            if rt.embedded_view_start(0)? {
                rt.text(0, Some("A"))?;
            }
            rt.embedded_view_end()?;
        }
        if blocks.empty {
            rt.embedded_view_start(1)?;
            rt.embedded_view_end()?;
        }
        if blocks.c {
            if rt.embedded_view_start(2)? {
                rt.text(0, Some("C"))?;
            }
            rt.embedded_view_end()?;
        }
        rt.container_refresh_end()
    }

    #[test]
    fn should_insert_before_later_views_when_an_empty_view_is_next() {
        let mut fixture = TemplateFixture::new(with_empty_block, vec![]);
        let without_a = Blocks {
            a: false,
            empty: true,
            c: true,
        };
        let all = Blocks {
            a: true,
            empty: true,
            c: true,
        };
        assert_eq!(fixture.render(&without_a).unwrap(), "C");
        assert_eq!(fixture.render(&all).unwrap(), "AC");
        assert_eq!(fixture.view().container(0).unwrap().len(), 3);
        assert_eq!(fixture.render(&without_a).unwrap(), "C");
    }

    // <div></div>, then a lookup of an unknown reference when `fail` is set
    fn fails_after_creating(rt: &mut Instructions<'_>, fail: &bool, cm: bool) -> Result<()> {
        if cm {
            rt.element_start(0, "div", &[], &[])?;
            rt.element_end()?;
        }
        if *fail {
            rt.reference("missing")?;
        }
        Ok(())
    }

    #[test]
    fn should_keep_registry_consistent_after_failed_creation_pass() {
        let mut fixture = TemplateFixture::new(fails_after_creating, vec![]);
        let result = fixture.render(&true);
        assert!(matches!(result, Err(RenderError::UnknownLocalRef { ref name }) if name == "missing"));
        assert!(!fixture.view().is_creation_mode());

        assert_eq!(fixture.render(&false).unwrap(), "<div></div>");
        assert_eq!(fixture.view().slot_count(), 1);
    }

    // % if (true) { x }, failing inside the embedded view when `fail` is set
    fn embedded_fails(rt: &mut Instructions<'_>, fail: &bool, cm: bool) -> Result<()> {
        if cm {
            rt.container(0)?;
        }
        rt.container_refresh_start(0)?;
        if rt.embedded_view_start(0)? {
            rt.text(0, Some("x"))?;
        }
        if *fail {
            rt.reference("missing")?;
        }
        rt.embedded_view_end()?;
        rt.container_refresh_end()
    }

    #[test]
    fn should_reuse_embedded_view_after_failed_creation_pass() {
        let mut fixture = TemplateFixture::new(embedded_fails, vec![]);
        assert!(fixture.render(&true).is_err());
        assert_eq!(fixture.html(), "x");

        assert_eq!(fixture.render(&false).unwrap(), "x");
        let container = fixture.view().container(0).unwrap();
        assert_eq!(container.len(), 1);
        assert_eq!(container.views()[0].slot_count(), 1);
    }
}
