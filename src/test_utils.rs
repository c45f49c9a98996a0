pub mod test_helpers {
    use crate::event_source::{Event, KeyCode, KeyEvent, KeyModifiers, SimulatedEventSource};
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    /// Builder for creating test scenarios with simulated user input
    #[derive(Default)]
    pub struct TestScenarioBuilder {
        events: Vec<Event>,
    }

    impl TestScenarioBuilder {
        pub fn new() -> Self {
            Self { events: Vec::new() }
        }

        fn key(mut self, code: KeyCode) -> Self {
            self.events.push(Event::Key(KeyEvent {
                code,
                modifiers: KeyModifiers::empty(),
                kind: crossterm::event::KeyEventKind::Press,
                state: crossterm::event::KeyEventState::empty(),
            }));
            self
        }

        /// Add a character key press
        pub fn press_char(mut self, c: char) -> Self {
            self.events.push(SimulatedEventSource::char_key(c));
            self
        }

        pub fn press_enter(self) -> Self {
            self.key(KeyCode::Enter)
        }

        pub fn press_esc(self) -> Self {
            self.key(KeyCode::Esc)
        }

        pub fn press_backspace(self) -> Self {
            self.key(KeyCode::Backspace)
        }

        /// Type text while a field is being edited
        pub fn type_text(mut self, text: &str) -> Self {
            self.events.extend(SimulatedEventSource::typed(text));
            self
        }

        /// Select the next field n times (press 'j' n times)
        pub fn select_next(mut self, times: usize) -> Self {
            for _ in 0..times {
                self.events.push(SimulatedEventSource::char_key('j'));
            }
            self
        }

        /// Select the previous field n times (press 'k' n times)
        pub fn select_prev(mut self, times: usize) -> Self {
            for _ in 0..times {
                self.events.push(SimulatedEventSource::char_key('k'));
            }
            self
        }

        pub fn next_page(self) -> Self {
            self.press_char('n')
        }

        pub fn prev_page(self) -> Self {
            self.press_char('p')
        }

        pub fn zoom_in(self) -> Self {
            self.press_char('+')
        }

        pub fn zoom_out(self) -> Self {
            self.press_char('-')
        }

        pub fn toggle_overlay(self) -> Self {
            self.press_char('o')
        }

        pub fn edit(self) -> Self {
            self.press_char('e')
        }

        pub fn save(self) -> Self {
            self.press_char('s')
        }

        /// Type the page number followed by `g`
        pub fn jump_to_page(self, page: usize) -> Self {
            self.type_text(&page.to_string()).press_char('g')
        }

        pub fn snapshot(self) -> Self {
            self.press_char('x')
        }

        pub fn reset(self) -> Self {
            self.press_char('r')
        }

        /// Left click on a terminal cell
        pub fn click(mut self, column: u16, row: u16) -> Self {
            self.events.push(SimulatedEventSource::click(column, row));
            self
        }

        /// Quit the application (press 'q')
        pub fn quit(self) -> Self {
            self.press_char('q')
        }

        /// Build the simulated event source
        pub fn build(self) -> SimulatedEventSource {
            SimulatedEventSource::new(self.events)
        }
    }

    /// Create a test terminal for snapshot testing
    pub fn create_test_terminal(width: u16, height: u16) -> Terminal<TestBackend> {
        let backend = TestBackend::new(width, height);
        Terminal::new(backend).unwrap()
    }

    /// Capture the current terminal buffer as a string
    pub fn capture_terminal_state(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        let mut lines = Vec::new();

        for y in 0..buffer.area.height {
            let mut line = String::new();
            for x in 0..buffer.area.width {
                line.push_str(buffer[(x, y)].symbol());
            }
            lines.push(line.trim_end().to_string());
        }

        while lines.last().is_some_and(|l| l.is_empty()) {
            lines.pop();
        }

        lines.join("\n")
    }
}

/// In-memory PDFs with AcroForm fields, built with lopdf
pub mod fixtures {
    use lopdf::{Document, Object, ObjectId, dictionary};

    struct FieldSpec {
        name: String,
        field_type: &'static str,
        flags: i64,
        page: usize,
        rect: [f32; 4],
        in_form: bool,
    }

    /// Builder for single-level form documents whose fields double as widgets
    pub struct FormPdfBuilder {
        pages: Vec<(f32, f32)>,
        fields: Vec<FieldSpec>,
        acro_form: bool,
        crop_box: Option<[f32; 4]>,
    }

    impl Default for FormPdfBuilder {
        fn default() -> Self {
            Self::new()
        }
    }

    impl FormPdfBuilder {
        pub fn new() -> Self {
            Self {
                pages: Vec::new(),
                fields: Vec::new(),
                acro_form: true,
                crop_box: None,
            }
        }

        /// Append a page of the given size in points
        pub fn page(mut self, width: f32, height: f32) -> Self {
            self.pages.push((width, height));
            self
        }

        pub fn text_field(self, name: &str, page: usize, rect: [f32; 4]) -> Self {
            self.field(name, "Tx", 0, page, rect)
        }

        pub fn checkbox(self, name: &str, page: usize, rect: [f32; 4]) -> Self {
            self.field(name, "Btn", 0, page, rect)
        }

        pub fn field(
            mut self,
            name: &str,
            field_type: &'static str,
            flags: i64,
            page: usize,
            rect: [f32; 4],
        ) -> Self {
            self.fields.push(FieldSpec {
                name: name.to_string(),
                field_type,
                flags,
                page,
                rect,
                in_form: true,
            });
            self
        }

        /// A widget on the page that the AcroForm does not list
        pub fn orphan_widget(mut self, name: &str, page: usize, rect: [f32; 4]) -> Self {
            self.fields.push(FieldSpec {
                name: name.to_string(),
                field_type: "Tx",
                flags: 0,
                page,
                rect,
                in_form: false,
            });
            self
        }

        /// Give every page this `/CropBox`
        pub fn crop_box(mut self, rect: [f32; 4]) -> Self {
            self.crop_box = Some(rect);
            self
        }

        /// Leave out `/AcroForm` from the catalog
        pub fn without_acro_form(mut self) -> Self {
            self.acro_form = false;
            self
        }

        pub fn build(self) -> Vec<u8> {
            let mut doc = Document::with_version("1.7");
            let pages_id = doc.new_object_id();
            let pages = if self.pages.is_empty() {
                vec![(612.0, 792.0)]
            } else {
                self.pages
            };

            let page_ids: Vec<ObjectId> = pages.iter().map(|_| doc.new_object_id()).collect();
            let mut annots: Vec<Vec<Object>> = vec![Vec::new(); page_ids.len()];
            let mut form_fields = Vec::new();

            for spec in &self.fields {
                let index = spec.page.clamp(1, page_ids.len()) - 1;
                let [x0, y0, x1, y1] = spec.rect;
                let mut widget = dictionary! {
                    "Type" => "Annot",
                    "Subtype" => "Widget",
                    "T" => Object::string_literal(spec.name.as_str()),
                    "FT" => spec.field_type,
                    "Rect" => vec![x0.into(), y0.into(), x1.into(), y1.into()],
                    "P" => page_ids[index],
                };
                if spec.flags != 0 {
                    widget.set("Ff", spec.flags);
                }
                let id = doc.add_object(widget);
                annots[index].push(id.into());
                if spec.in_form {
                    form_fields.push(Object::from(id));
                }
            }

            for ((page_id, (width, height)), annots) in page_ids.iter().zip(&pages).zip(annots) {
                let mut page = dictionary! {
                    "Type" => "Page",
                    "Parent" => pages_id,
                    "MediaBox" => vec![0.into(), 0.into(), (*width).into(), (*height).into()],
                    "Annots" => annots,
                };
                if let Some([x0, y0, x1, y1]) = self.crop_box {
                    page.set(
                        "CropBox",
                        vec![x0.into(), y0.into(), x1.into(), y1.into()],
                    );
                }
                doc.objects.insert(*page_id, Object::Dictionary(page));
            }

            doc.objects.insert(
                pages_id,
                Object::Dictionary(dictionary! {
                    "Type" => "Pages",
                    "Kids" => page_ids.iter().map(|id| Object::from(*id)).collect::<Vec<_>>(),
                    "Count" => page_ids.len() as i64,
                }),
            );

            let mut catalog = dictionary! {
                "Type" => "Catalog",
                "Pages" => pages_id,
            };
            if self.acro_form {
                let acro_form_id = doc.add_object(dictionary! { "Fields" => form_fields });
                catalog.set("AcroForm", acro_form_id);
            }
            let catalog_id = doc.add_object(catalog);
            doc.trailer.set("Root", catalog_id);

            let mut bytes = Vec::new();
            doc.save_to(&mut bytes).unwrap();
            bytes
        }
    }

    /// One Letter page with `name_field` at `[100, 500, 300, 530]` on a 600x800 page
    pub fn name_field_pdf() -> Vec<u8> {
        FormPdfBuilder::new()
            .page(600.0, 800.0)
            .text_field("name_field", 1, [100.0, 500.0, 300.0, 530.0])
            .build()
    }

    /// Two pages, three fields, two of them on page 1
    pub fn two_page_form() -> Vec<u8> {
        FormPdfBuilder::new()
            .page(612.0, 792.0)
            .page(612.0, 792.0)
            .text_field("first_name", 1, [72.0, 700.0, 272.0, 720.0])
            .checkbox("subscribe", 1, [72.0, 650.0, 86.0, 664.0])
            .text_field("signature", 2, [72.0, 100.0, 300.0, 130.0])
            .build()
    }

    /// `address.city` nested under a non-terminal parent, plus a top-level
    /// `agree` checkbox. Neither field has a widget on the page.
    pub fn nested_form() -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );

        let address_id = doc.new_object_id();
        let city_id = doc.add_object(dictionary! {
            "T" => Object::string_literal("city"),
            "FT" => "Tx",
            "Parent" => address_id,
        });
        doc.objects.insert(
            address_id,
            Object::Dictionary(dictionary! {
                "T" => Object::string_literal("address"),
                "Kids" => vec![city_id.into()],
            }),
        );
        let agree_id = doc.add_object(dictionary! {
            "T" => Object::string_literal("agree"),
            "FT" => "Btn",
        });

        let acro_form_id = doc.add_object(dictionary! {
            "Fields" => vec![address_id.into(), agree_id.into()],
        });
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
            "AcroForm" => acro_form_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }
}

/// Engines and models with controllable behavior
pub mod fakes {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use flume::{Receiver, Sender};

    use crate::catalog::StructuralFieldInfo;
    use crate::forms::{DocumentModel, FormDocument, LopdfForm, ModelFault};
    use crate::pdf::{EngineFault, OutlineEngine, RenderEngine, RenderedDocument};

    /// Outline engine that counts how often documents are opened
    #[derive(Default)]
    pub struct CountingEngine {
        opens: AtomicUsize,
    }

    impl CountingEngine {
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        pub fn opens(&self) -> usize {
            self.opens.load(Ordering::SeqCst)
        }
    }

    impl RenderEngine for CountingEngine {
        fn open(&self, bytes: &[u8]) -> Result<Box<dyn RenderedDocument>, EngineFault> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            OutlineEngine.open(bytes)
        }
    }

    /// Engine whose `open` blocks until the test releases it
    pub struct GatedEngine {
        gate: Receiver<()>,
    }

    impl GatedEngine {
        /// The sender releases one blocked `open` per message
        pub fn new() -> (Arc<Self>, Sender<()>) {
            let (tx, rx) = flume::unbounded();
            (Arc::new(Self { gate: rx }), tx)
        }
    }

    impl RenderEngine for GatedEngine {
        fn open(&self, bytes: &[u8]) -> Result<Box<dyn RenderedDocument>, EngineFault> {
            let _ = self.gate.recv();
            OutlineEngine.open(bytes)
        }
    }

    /// Engine that cannot open anything
    pub struct FailingEngine;

    impl RenderEngine for FailingEngine {
        fn open(&self, _bytes: &[u8]) -> Result<Box<dyn RenderedDocument>, EngineFault> {
            Err(EngineFault::generic("engine refused the document"))
        }
    }

    /// Model whose structural parse always fails
    pub struct FailingModel;

    impl DocumentModel for FailingModel {
        fn load(&self, _bytes: &[u8]) -> Result<Box<dyn FormDocument>, ModelFault> {
            Err(ModelFault::generic("form dictionary is corrupt"))
        }
    }

    /// lopdf model whose serialization always fails
    pub struct UnsavableModel;

    struct UnsavableForm(LopdfForm);

    impl FormDocument for UnsavableForm {
        fn fields(&self) -> Vec<StructuralFieldInfo> {
            self.0.fields()
        }

        fn save(&self) -> Result<Vec<u8>, ModelFault> {
            Err(ModelFault::generic("disk full"))
        }
    }

    impl DocumentModel for UnsavableModel {
        fn load(&self, bytes: &[u8]) -> Result<Box<dyn FormDocument>, ModelFault> {
            Ok(Box::new(UnsavableForm(LopdfForm::load(bytes)?)))
        }
    }
}
