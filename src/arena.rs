//
// Copyright 2022-Present (c) Raja Lehtihet & Wael El Oraiby
//
// Redistribution and use in source and binary forms, with or without
// modification, are permitted provided that the following conditions are met:
//
// 1. Redistributions of source code must retain the above copyright notice,
// this list of conditions and the following disclaimer.
//
// 2. Redistributions in binary form must reproduce the above copyright notice,
// this list of conditions and the following disclaimer in the documentation
// and/or other materials provided with the distribution.
//
// 3. Neither the name of the copyright holder nor the names of its contributors
// may be used to endorse or promote products derived from this software without
// specific prior written permission.
//
// THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS "AS IS"
// AND ANY EXPRESS OR IMPLIED WARRANTIES, INCLUDING, BUT NOT LIMITED TO, THE
// IMPLIED WARRANTIES OF MERCHANTABILITY AND FITNESS FOR A PARTICULAR PURPOSE
// ARE DISCLAIMED. IN NO EVENT SHALL THE COPYRIGHT HOLDER OR CONTRIBUTORS BE
// LIABLE FOR ANY DIRECT, INDIRECT, INCIDENTAL, SPECIAL, EXEMPLARY, OR
// CONSEQUENTIAL DAMAGES (INCLUDING, BUT NOT LIMITED TO, PROCUREMENT OF
// SUBSTITUTE GOODS OR SERVICES; LOSS OF USE, DATA, OR PROFITS; OR BUSINESS
// INTERRUPTION) HOWEVER CAUSED AND ON ANY THEORY OF LIABILITY, WHETHER IN
// CONTRACT, STRICT LIABILITY, OR TORT (INCLUDING NEGLIGENCE OR OTHERWISE)
// ARISING IN ANY WAY OUT OF THE USE OF THIS SOFTWARE, EVEN IF ADVISED OF THE
// POSSIBILITY OF SUCH DAMAGE.
//
use crate::node::Widget;

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
/// Handle to a widget owned by a [`Scene`](crate::Scene).
///
/// Handles are generation-checked: once the owning canvas (or the whole scene) is
/// destroyed, every handle into the destroyed subtree fails validity checks and all
/// operations taking it become no-ops instead of touching a recycled slot.
pub struct WidgetRef {
    pub(crate) slot: u32,
    pub(crate) generation: u32,
}

struct Entry {
    generation: u32,
    widget: Option<Widget>,
}

#[derive(Default)]
pub(crate) struct Arena {
    entries: Vec<Entry>,
    free: Vec<u32>,
}

impl Arena {
    pub fn new() -> Self { Self { entries: Vec::new(), free: Vec::new() } }

    pub fn insert(&mut self, widget: Widget) -> WidgetRef {
        match self.free.pop() {
            Some(slot) => {
                let entry = &mut self.entries[slot as usize];
                entry.widget = Some(widget);
                WidgetRef { slot, generation: entry.generation }
            }
            None => {
                let slot = self.entries.len() as u32;
                self.entries.push(Entry { generation: 0, widget: Some(widget) });
                WidgetRef { slot, generation: 0 }
            }
        }
    }

    pub fn get(&self, r: WidgetRef) -> Option<&Widget> {
        self.entries
            .get(r.slot as usize)
            .filter(|e| e.generation == r.generation)
            .and_then(|e| e.widget.as_ref())
    }

    pub fn get_mut(&mut self, r: WidgetRef) -> Option<&mut Widget> {
        self.entries
            .get_mut(r.slot as usize)
            .filter(|e| e.generation == r.generation)
            .and_then(|e| e.widget.as_mut())
    }

    pub fn contains(&self, r: WidgetRef) -> bool { self.get(r).is_some() }

    pub fn remove(&mut self, r: WidgetRef) -> Option<Widget> {
        let entry = self.entries.get_mut(r.slot as usize)?;
        if entry.generation != r.generation || entry.widget.is_none() {
            return None;
        }
        entry.generation = entry.generation.wrapping_add(1);
        self.free.push(r.slot);
        entry.widget.take()
    }
}
