//! Tidy tree positioning (Buchheim, Jünger and Leipert's linear-time Walker variant).
//!
//! Works on the breadth axis only, in pixels: the separation callback returns the
//! required centre-to-centre distance between two nodes that end up adjacent on the same
//! depth. The root is placed at breadth 0.

/// Input node: parent index (`None` for the root) and children in order.
#[derive(Debug, Clone, Default)]
pub struct TidyInput {
    pub parent: Option<usize>,
    pub children: Vec<usize>,
}

#[derive(Debug, Clone)]
struct Slot {
    parent: usize,
    children: Vec<usize>,
    /// Default ancestor, only meaningful on internal nodes.
    default_ancestor: Option<usize>,
    ancestor: usize,
    prelim: f64,
    modifier: f64,
    change: f64,
    shift: f64,
    thread: Option<usize>,
    number: usize,
}

struct Walker<'a, S> {
    slots: Vec<Slot>,
    separation: &'a S,
}

/// Returns the breadth coordinate of every input node. `nodes[root]` must have no parent
/// and every other node must be reachable from it.
pub fn tidy_breadth<S>(nodes: &[TidyInput], root: usize, separation: &S) -> Vec<f64>
where
    S: Fn(usize, usize) -> f64,
{
    if nodes.is_empty() {
        return Vec::new();
    }

    // Slot `n` is a synthetic parent of the root; slot `i < n` mirrors `nodes[i]`.
    let n = nodes.len();
    let mut slots: Vec<Slot> = nodes
        .iter()
        .enumerate()
        .map(|(i, node)| Slot {
            parent: node.parent.unwrap_or(n),
            children: node.children.clone(),
            default_ancestor: None,
            ancestor: i,
            prelim: 0.0,
            modifier: 0.0,
            change: 0.0,
            shift: 0.0,
            thread: None,
            number: 0,
        })
        .collect();
    for node in nodes {
        for (k, &c) in node.children.iter().enumerate() {
            slots[c].number = k;
        }
    }
    slots.push(Slot {
        parent: n,
        children: vec![root],
        default_ancestor: None,
        ancestor: n,
        prelim: 0.0,
        modifier: 0.0,
        change: 0.0,
        shift: 0.0,
        thread: None,
        number: 0,
    });
    slots[root].parent = n;
    slots[root].number = 0;

    let mut w = Walker { slots, separation };
    w.first_walk(root);
    w.slots[n].modifier = -w.slots[root].prelim;

    let mut out = vec![0.0; n];
    w.second_walk(root, &mut out);
    out
}

impl<S> Walker<'_, S>
where
    S: Fn(usize, usize) -> f64,
{
    fn sep(&self, a: usize, b: usize) -> f64 {
        (self.separation)(a, b)
    }

    fn next_left(&self, v: usize) -> Option<usize> {
        match self.slots[v].children.first() {
            Some(&c) => Some(c),
            None => self.slots[v].thread,
        }
    }

    fn next_right(&self, v: usize) -> Option<usize> {
        match self.slots[v].children.last() {
            Some(&c) => Some(c),
            None => self.slots[v].thread,
        }
    }

    fn left_sibling(&self, v: usize) -> Option<usize> {
        let number = self.slots[v].number;
        if number == 0 {
            return None;
        }
        let parent = self.slots[v].parent;
        self.slots[parent].children.get(number - 1).copied()
    }

    /// Post-order pass computing preliminary positions and modifiers.
    fn first_walk(&mut self, v: usize) {
        let children = self.slots[v].children.clone();
        for &c in &children {
            self.first_walk(c);
        }

        let w = self.left_sibling(v);
        if let (Some(&first), Some(&last)) = (children.first(), children.last()) {
            self.execute_shifts(v);
            let midpoint = (self.slots[first].prelim + self.slots[last].prelim) / 2.0;
            match w {
                Some(w) => {
                    self.slots[v].prelim = self.slots[w].prelim + self.sep(v, w);
                    self.slots[v].modifier = self.slots[v].prelim - midpoint;
                }
                None => self.slots[v].prelim = midpoint,
            }
        } else if let Some(w) = w {
            self.slots[v].prelim = self.slots[w].prelim + self.sep(v, w);
        }

        let parent = self.slots[v].parent;
        let default_ancestor = self.slots[parent]
            .default_ancestor
            .unwrap_or(self.slots[parent].children[0]);
        let next = self.apportion(v, w, default_ancestor);
        self.slots[parent].default_ancestor = Some(next);
    }

    fn apportion(&mut self, v: usize, w: Option<usize>, mut ancestor: usize) -> usize {
        let Some(w) = w else {
            return ancestor;
        };
        let parent = self.slots[v].parent;
        let mut vip = v;
        let mut vop = v;
        let mut vim = w;
        let mut vom = self.slots[parent].children[0];
        let mut sip = self.slots[vip].modifier;
        let mut sop = self.slots[vop].modifier;
        let mut sim = self.slots[vim].modifier;
        let mut som = self.slots[vom].modifier;

        let mut next_im = self.next_right(vim);
        let mut next_ip = self.next_left(vip);
        while let (Some(im), Some(ip)) = (next_im, next_ip) {
            vim = im;
            vip = ip;
            // Contours of the same height always continue on the outer sides.
            vom = self.next_left(vom).unwrap_or(vom);
            vop = self.next_right(vop).unwrap_or(vop);
            self.slots[vop].ancestor = v;
            let shift =
                self.slots[vim].prelim + sim - self.slots[vip].prelim - sip + self.sep(vim, vip);
            if shift > 0.0 {
                let a = self.next_ancestor(vim, v, ancestor);
                self.move_subtree(a, v, shift);
                sip += shift;
                sop += shift;
            }
            sim += self.slots[vim].modifier;
            sip += self.slots[vip].modifier;
            som += self.slots[vom].modifier;
            sop += self.slots[vop].modifier;
            next_im = self.next_right(vim);
            next_ip = self.next_left(vip);
        }

        if let (Some(im), None) = (next_im, self.next_right(vop)) {
            self.slots[vop].thread = Some(im);
            self.slots[vop].modifier += sim - sop;
        }
        if let (Some(ip), None) = (next_ip, self.next_left(vom)) {
            self.slots[vom].thread = Some(ip);
            self.slots[vom].modifier += sip - som;
            ancestor = v;
        }
        ancestor
    }

    fn next_ancestor(&self, vim: usize, v: usize, ancestor: usize) -> usize {
        let a = self.slots[vim].ancestor;
        if self.slots[a].parent == self.slots[v].parent {
            a
        } else {
            ancestor
        }
    }

    fn move_subtree(&mut self, wm: usize, wp: usize, shift: f64) {
        let span = self.slots[wp].number as f64 - self.slots[wm].number as f64;
        let change = shift / span;
        self.slots[wp].change -= change;
        self.slots[wp].shift += shift;
        self.slots[wm].change += change;
        self.slots[wp].prelim += shift;
        self.slots[wp].modifier += shift;
    }

    fn execute_shifts(&mut self, v: usize) {
        let mut shift = 0.0;
        let mut change = 0.0;
        let children = self.slots[v].children.clone();
        for &c in children.iter().rev() {
            self.slots[c].prelim += shift;
            self.slots[c].modifier += shift;
            change += self.slots[c].change;
            shift += self.slots[c].shift + change;
        }
    }

    /// Pre-order pass accumulating modifiers into final positions.
    fn second_walk(&mut self, v: usize, out: &mut [f64]) {
        let parent = self.slots[v].parent;
        let parent_mod = self.slots[parent].modifier;
        out[v] = self.slots[v].prelim + parent_mod;
        self.slots[v].modifier += parent_mod;
        let children = self.slots[v].children.clone();
        for c in children {
            self.second_walk(c, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(parents: &[Option<usize>]) -> Vec<TidyInput> {
        let mut nodes: Vec<TidyInput> = parents
            .iter()
            .map(|p| TidyInput {
                parent: *p,
                children: Vec::new(),
            })
            .collect();
        for (i, p) in parents.iter().enumerate() {
            if let Some(p) = p {
                nodes[*p].children.push(i);
            }
        }
        nodes
    }

    #[test]
    fn single_node_sits_at_zero() {
        let nodes = chain(&[None]);
        assert_eq!(tidy_breadth(&nodes, 0, &|_, _| 10.0), vec![0.0]);
    }

    #[test]
    fn parent_is_centred_over_children() {
        let nodes = chain(&[None, Some(0), Some(0), Some(0)]);
        let xs = tidy_breadth(&nodes, 0, &|_, _| 10.0);
        assert_eq!(xs, vec![0.0, -10.0, 0.0, 10.0]);
    }

    #[test]
    fn cousin_subtrees_do_not_overlap() {
        // 0 → {1, 2}; 1 → {3, 4, 5}; 2 → {6, 7, 8}
        let nodes = chain(&[
            None,
            Some(0),
            Some(0),
            Some(1),
            Some(1),
            Some(1),
            Some(2),
            Some(2),
            Some(2),
        ]);
        let xs = tidy_breadth(&nodes, 0, &|_, _| 10.0);
        assert_eq!(xs[0], 0.0);
        assert_eq!(xs[6] - xs[5], 10.0);
        assert_eq!(xs[4], xs[1]);
        assert_eq!(xs[7], xs[2]);
        assert_eq!(xs[1] + xs[2], 0.0);
    }

    #[test]
    fn uneven_subtrees_keep_minimum_gaps_per_depth() {
        // 0 → {1, 2, 3}; 1 → {4, 5, 6, 7}; 3 → {8}
        let nodes = chain(&[
            None,
            Some(0),
            Some(0),
            Some(0),
            Some(1),
            Some(1),
            Some(1),
            Some(1),
            Some(3),
        ]);
        let xs = tidy_breadth(&nodes, 0, &|_, _| 5.0);
        for pair in [(1, 2), (2, 3), (4, 5), (5, 6), (6, 7), (7, 8)] {
            assert!(xs[pair.1] - xs[pair.0] >= 5.0 - 1e-9, "{pair:?}: {xs:?}");
        }
    }
}
